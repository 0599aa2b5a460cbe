//! # Delivery Zones
//!
//! Named areas (neighbourhoods, condominiums) whose fee, minimum order and
//! ETA may differ from the establishment defaults.
//!
//! ## Fallback Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  field            zone override?      result                           │
//! │  ───────────────  ──────────────      ─────────────────────────────    │
//! │  fee rule         Some(fixed fee)     flat fee, distance ignored       │
//! │                   None                establishment DeliveryFeeRule    │
//! │  minimum order    Some / None         zone value / establishment value │
//! │  ETA min / max    Some / None         each falls back independently    │
//! │                                                                         │
//! │  Inactive zone → every field falls back to the establishment           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::delivery::{quote, DeliveryFeeRule, DeliveryQuote};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::geo::Coordinates;
use crate::money::Money;
use crate::validation::validate_amount;

// =============================================================================
// Establishment Defaults
// =============================================================================

/// Delivery settings of the establishment, used when no zone applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EstablishmentDefaults {
    /// Tiered fee rule.
    pub fee_rule: DeliveryFeeRule,

    /// Minimum subtotal for delivery orders.
    pub minimum_order: Money,

    /// Lower bound of the advertised delivery window, in minutes.
    pub eta_min_minutes: u32,

    /// Upper bound of the advertised delivery window, in minutes.
    pub eta_max_minutes: u32,
}

impl Default for EstablishmentDefaults {
    fn default() -> Self {
        EstablishmentDefaults {
            fee_rule: DeliveryFeeRule::default(),
            minimum_order: Money::from_cents(2000),
            eta_min_minutes: 30,
            eta_max_minutes: 50,
        }
    }
}

// =============================================================================
// Delivery Zone
// =============================================================================

/// A named delivery area with optional overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DeliveryZone {
    pub id: String,
    pub name: String,
    /// Flat fee for the whole zone.
    pub fee_override: Option<Money>,
    pub minimum_order_override: Option<Money>,
    pub eta_min_override: Option<i64>,
    pub eta_max_override: Option<i64>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl DeliveryZone {
    /// Checks the zone's own values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        crate::validation::validate_zone_name(&self.name)?;
        if let Some(fee) = self.fee_override {
            validate_amount("fee_override", fee)?;
        }
        if let Some(minimum) = self.minimum_order_override {
            validate_amount("minimum_order_override", minimum)?;
        }
        if let (Some(min), Some(max)) = (self.eta_min_override, self.eta_max_override) {
            if max < min {
                return Err(ValidationError::OutOfRange {
                    field: "eta_max_override".to_string(),
                    min: min as f64,
                    max: f64::MAX,
                });
            }
        }
        for (field, value) in [
            ("eta_min_override", self.eta_min_override),
            ("eta_max_override", self.eta_max_override),
        ] {
            if value.is_some_and(|v| v < 0) {
                return Err(ValidationError::MustNotBeNegative {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// A zone as submitted by the admin panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewZone {
    pub name: String,
    #[serde(default)]
    pub fee_override: Option<Money>,
    #[serde(default)]
    pub minimum_order_override: Option<Money>,
    #[serde(default)]
    pub eta_min_override: Option<i64>,
    #[serde(default)]
    pub eta_max_override: Option<i64>,
}

impl NewZone {
    /// Builds the active zone record that will be stored.
    pub fn into_zone(self, id: String, now: DateTime<Utc>) -> DeliveryZone {
        DeliveryZone {
            id,
            name: self.name.trim().to_string(),
            fee_override: self.fee_override,
            minimum_order_override: self.minimum_order_override,
            eta_min_override: self.eta_min_override,
            eta_max_override: self.eta_max_override,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

impl EstablishmentDefaults {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.fee_rule.validate()?;
        validate_amount("minimum_order", self.minimum_order)?;
        if self.eta_max_minutes < self.eta_min_minutes {
            return Err(ValidationError::OutOfRange {
                field: "eta_max_minutes".to_string(),
                min: self.eta_min_minutes as f64,
                max: f64::MAX,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Effective Terms
// =============================================================================

/// How the fee is priced for a given order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum FeePolicy {
    /// Use the distance-based tiers.
    Tiered { rule: DeliveryFeeRule },
    /// Zone charges one flat fee.
    Flat { fee: Money },
}

/// Delivery terms after applying zone overrides to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeliveryTerms {
    /// Zone that produced the terms, if any.
    pub zone_id: Option<String>,
    pub fee_policy: FeePolicy,
    pub minimum_order: Money,
    pub eta_min_minutes: u32,
    pub eta_max_minutes: u32,
}

impl DeliveryTerms {
    /// Rejects a subtotal under the minimum order.
    pub fn check_minimum_order(&self, subtotal: Money) -> CoreResult<()> {
        if subtotal < self.minimum_order {
            return Err(CoreError::BelowMinimumOrder {
                minimum: self.minimum_order,
                subtotal,
            });
        }
        Ok(())
    }

    /// Prices a delivery under these terms.
    ///
    /// A flat zone fee ignores distance, range and the free-delivery
    /// threshold; the distance is still reported.
    pub fn quote(
        &self,
        origin: &Coordinates,
        destination: &Coordinates,
        subtotal: Option<Money>,
    ) -> CoreResult<DeliveryQuote> {
        match &self.fee_policy {
            FeePolicy::Tiered { rule } => quote(rule, origin, destination, subtotal),
            FeePolicy::Flat { fee } => {
                origin.validate()?;
                destination.validate()?;
                Ok(DeliveryQuote {
                    distance_km: origin.distance_to(destination).km(),
                    base_fee: *fee,
                    distance_fee: Money::zero(),
                    fee: *fee,
                    free_delivery: false,
                })
            }
        }
    }
}

/// Resolves the effective terms for an order.
///
/// ```rust
/// use entrega_core::zone::{resolve_terms, EstablishmentDefaults, FeePolicy};
///
/// let defaults = EstablishmentDefaults::default();
/// let terms = resolve_terms(&defaults, None);
/// assert!(matches!(terms.fee_policy, FeePolicy::Tiered { .. }));
/// assert_eq!(terms.minimum_order, defaults.minimum_order);
/// ```
pub fn resolve_terms(
    defaults: &EstablishmentDefaults,
    zone: Option<&DeliveryZone>,
) -> DeliveryTerms {
    let Some(zone) = zone.filter(|z| z.is_active) else {
        return DeliveryTerms {
            zone_id: None,
            fee_policy: FeePolicy::Tiered {
                rule: defaults.fee_rule.clone(),
            },
            minimum_order: defaults.minimum_order,
            eta_min_minutes: defaults.eta_min_minutes,
            eta_max_minutes: defaults.eta_max_minutes,
        };
    };

    let fee_policy = match zone.fee_override {
        Some(fee) => FeePolicy::Flat { fee },
        None => FeePolicy::Tiered {
            rule: defaults.fee_rule.clone(),
        },
    };

    let eta_min = zone
        .eta_min_override
        .map(to_minutes)
        .unwrap_or(defaults.eta_min_minutes);
    let eta_max = zone
        .eta_max_override
        .map(to_minutes)
        .unwrap_or(defaults.eta_max_minutes);

    DeliveryTerms {
        zone_id: Some(zone.id.clone()),
        fee_policy,
        minimum_order: zone.minimum_order_override.unwrap_or(defaults.minimum_order),
        eta_min_minutes: eta_min,
        // A zone may override only one end; keep the window ordered
        eta_max_minutes: eta_max.max(eta_min),
    }
}

fn to_minutes(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}

// =============================================================================
// Unit Tests
// =============================================================================
