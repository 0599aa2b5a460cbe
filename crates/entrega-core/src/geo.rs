//! # Geo Module
//!
//! Coordinates and great-circle distance between the establishment and the
//! customer.
//!
//! ## Haversine Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  a = sin²(Δφ/2) + cos φ1 · cos φ2 · sin²(Δλ/2)                         │
//! │  c = 2 · atan2(√a, √(1−a))                                             │
//! │  d = R · c            (R = 6371 km)                                    │
//! │                                                                         │
//! │  φ = latitude, λ = longitude, both in radians                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Straight-line distance underestimates the road distance; the ETA
//! heuristic compensates with a road factor, the fee does not.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::EARTH_RADIUS_KM;

// =============================================================================
// Coordinates
// =============================================================================

/// A latitude/longitude pair in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Creates validated coordinates.
    ///
    /// ## Rules
    /// - Both values finite
    /// - `lat` in `[-90, 90]`, `lng` in `[-180, 180]`
    ///
    /// ```rust
    /// use entrega_core::geo::Coordinates;
    ///
    /// assert!(Coordinates::new(-23.5505, -46.6333).is_ok());
    /// assert!(Coordinates::new(91.0, 0.0).is_err());
    /// ```
    pub fn new(lat: f64, lng: f64) -> Result<Self, ValidationError> {
        let coords = Coordinates { lat, lng };
        coords.validate()?;
        Ok(coords)
    }

    /// Checks the range rules of [`Coordinates::new`] on an existing value
    /// (e.g. one deserialized from a request body).
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("lat", self.lat, 90.0)?;
        check_range("lng", self.lng, 180.0)
    }

    /// Great-circle distance to `other`.
    pub fn distance_to(&self, other: &Coordinates) -> Distance {
        Distance::from_km(haversine_km(self, other))
    }
}

fn check_range(field: &str, value: f64, limit: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    if value < -limit || value > limit {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: -limit,
            max: limit,
        });
    }
    Ok(())
}

/// Haversine great-circle distance in kilometers.
///
/// Symmetric in its arguments and exactly `0.0` for identical points.
pub fn haversine_km(a: &Coordinates, b: &Coordinates) -> f64 {
    if a == b {
        return 0.0;
    }

    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    // abs() keeps the result bit-identical when the arguments are swapped
    let d_phi = (b.lat - a.lat).abs().to_radians();
    let d_lambda = (b.lng - a.lng).abs().to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

// =============================================================================
// Distance
// =============================================================================

/// A distance in whole meters.
///
/// Money math runs on meters so the fee never depends on float rounding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Distance(u64);

impl Distance {
    /// Creates a distance from meters.
    #[inline]
    pub const fn from_meters(meters: u64) -> Self {
        Distance(meters)
    }

    /// Creates a distance from kilometers, rounded to the nearest meter.
    /// Negative and non-finite inputs become zero.
    pub fn from_km(km: f64) -> Self {
        if !km.is_finite() || km <= 0.0 {
            return Distance(0);
        }
        Distance((km * 1000.0).round() as u64)
    }

    /// Returns the distance in meters.
    #[inline]
    pub const fn meters(&self) -> u64 {
        self.0
    }

    /// Returns the distance in kilometers.
    #[inline]
    pub fn km(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Meters beyond `radius`, zero when inside it.
    #[inline]
    pub const fn excess_over(&self, radius: Distance) -> Distance {
        Distance(self.0.saturating_sub(radius.0))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
