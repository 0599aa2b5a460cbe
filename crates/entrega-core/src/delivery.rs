//! # Delivery Fee Module
//!
//! Tiered delivery fee: a base fee covers an included radius, every
//! kilometer beyond it is charged at a fixed price.
//!
//! ## Fee Curve
//! ```text
//! fee
//!  │                                   ╱
//!  │                                ╱      slope = price_per_km
//!  │                             ╱
//!  │  base_fee ───────────────●
//!  │                          │
//!  └──────────────────────────┴──────────────────── distance
//!   0                   included_km        max_distance_km (rejected beyond)
//! ```
//!
//! `fee = base + max(0, distance − included) × price_per_km`, computed on
//! whole meters and rounded once, to the centavo.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::geo::{Coordinates, Distance};
use crate::money::Money;
use crate::validation::{validate_amount, validate_km};

// =============================================================================
// Fee Rule
// =============================================================================

/// Parameters of the tiered delivery fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeliveryFeeRule {
    /// Flat fee charged for any delivery.
    pub base_fee: Money,

    /// Radius covered by the base fee, in kilometers.
    pub included_km: f64,

    /// Price of each kilometer beyond the included radius.
    pub price_per_km: Money,

    /// Farthest address the establishment delivers to.
    #[serde(default)]
    pub max_distance_km: Option<f64>,

    /// Orders with a subtotal at or above this amount ship for free.
    #[serde(default)]
    pub free_above: Option<Money>,
}

impl DeliveryFeeRule {
    /// Creates a rule without distance limit or free-delivery threshold.
    pub fn new(base_fee: Money, included_km: f64, price_per_km: Money) -> Self {
        DeliveryFeeRule {
            base_fee,
            included_km,
            price_per_km,
            max_distance_km: None,
            free_above: None,
        }
    }

    /// Sets the maximum delivery distance.
    pub fn with_max_distance_km(mut self, km: f64) -> Self {
        self.max_distance_km = Some(km);
        self
    }

    /// Sets the free-delivery threshold.
    pub fn with_free_above(mut self, amount: Money) -> Self {
        self.free_above = Some(amount);
        self
    }

    /// The included radius as a [`Distance`].
    pub fn included_radius(&self) -> Distance {
        Distance::from_km(self.included_km)
    }

    /// Checks that the rule can produce a sensible fee.
    ///
    /// ## Rules
    /// - Money values not negative and at most
    ///   [`MAX_MONEY_CENTS`](crate::MAX_MONEY_CENTS)
    /// - `included_km` finite and not negative
    /// - `max_distance_km`, when set, positive and not below `included_km`
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_amount("base_fee", self.base_fee)?;
        validate_amount("price_per_km", self.price_per_km)?;
        validate_km("included_km", self.included_km)?;
        if let Some(max) = self.max_distance_km {
            if !max.is_finite() || max <= 0.0 {
                return Err(ValidationError::must_be_positive("max_distance_km"));
            }
            if max < self.included_km {
                return Err(ValidationError::OutOfRange {
                    field: "max_distance_km".to_string(),
                    min: self.included_km,
                    max: f64::MAX,
                });
            }
        }
        if let Some(free_above) = self.free_above {
            validate_amount("free_above", free_above)?;
        }
        Ok(())
    }
}

impl Default for DeliveryFeeRule {
    /// R$ 5,00 up to 3 km, R$ 1,50 per extra km, no limit.
    fn default() -> Self {
        DeliveryFeeRule::new(Money::from_cents(500), 3.0, Money::from_cents(150))
    }
}

// =============================================================================
// Fee Calculation
// =============================================================================

/// Computes the tiered fee for a distance.
///
/// ## Guarantees
/// - `distance ≤ included` → exactly `base_fee`
/// - non-decreasing in `distance`
///
/// ```rust
/// use entrega_core::delivery::{calculate_fee, DeliveryFeeRule};
/// use entrega_core::geo::Distance;
/// use entrega_core::money::Money;
///
/// let rule = DeliveryFeeRule::new(Money::from_cents(500), 3.0, Money::from_cents(150));
/// assert_eq!(calculate_fee(&rule, Distance::from_km(3.0)).cents(), 500);
/// assert_eq!(calculate_fee(&rule, Distance::from_km(4.5)).cents(), 725);
/// ```
pub fn calculate_fee(rule: &DeliveryFeeRule, distance: Distance) -> Money {
    rule.base_fee + distance_component(rule, distance)
}

/// The per-km part of the fee alone.
fn distance_component(rule: &DeliveryFeeRule, distance: Distance) -> Money {
    let excess = distance.excess_over(rule.included_radius());
    rule.price_per_km.scale_rounded(excess.meters() as i64, 1000)
}

// =============================================================================
// Quote
// =============================================================================

/// A priced delivery from the establishment to a customer address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeliveryQuote {
    /// Straight-line distance in kilometers (3 decimals).
    pub distance_km: f64,

    /// Base part of the fee.
    pub base_fee: Money,

    /// Distance part of the fee.
    pub distance_fee: Money,

    /// Fee charged to the customer (zero when delivery is free).
    pub fee: Money,

    /// True when the free-delivery threshold waived the fee.
    pub free_delivery: bool,
}

/// Prices a delivery between two points.
///
/// ## Flow
/// ```text
/// origin, destination ──► haversine ──► Distance
///                                          │
///                 max_distance_km? ────────┤──► OutOfDeliveryRange
///                                          ▼
///                               base + distance component
///                                          │
///                 subtotal ≥ free_above? ──┤──► fee = 0
///                                          ▼
///                                    DeliveryQuote
/// ```
pub fn quote(
    rule: &DeliveryFeeRule,
    origin: &Coordinates,
    destination: &Coordinates,
    subtotal: Option<Money>,
) -> CoreResult<DeliveryQuote> {
    rule.validate()?;
    origin.validate()?;
    destination.validate()?;

    let distance = origin.distance_to(destination);
    quote_for_distance(rule, distance, subtotal)
}

/// Prices a delivery for an already known distance (e.g. a routed one).
pub fn quote_for_distance(
    rule: &DeliveryFeeRule,
    distance: Distance,
    subtotal: Option<Money>,
) -> CoreResult<DeliveryQuote> {
    if let Some(max_km) = rule.max_distance_km {
        if distance > Distance::from_km(max_km) {
            return Err(CoreError::OutOfDeliveryRange {
                distance_km: distance.km(),
                max_km,
            });
        }
    }

    let distance_fee = distance_component(rule, distance);
    let free_delivery = matches!(
        (rule.free_above, subtotal),
        (Some(threshold), Some(subtotal)) if subtotal >= threshold
    );
    let fee = if free_delivery {
        Money::zero()
    } else {
        rule.base_fee + distance_fee
    };

    Ok(DeliveryQuote {
        distance_km: distance.km(),
        base_fee: rule.base_fee,
        distance_fee,
        fee,
        free_delivery,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
