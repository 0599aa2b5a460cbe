//! # ETA Module
//!
//! Estimates when an order reaches the customer: kitchen prep time plus
//! rider travel time, displayed as a min/max window.
//!
//! ## Estimation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  minute of day ──► base_prep + Σ matching peak windows ──► prep        │
//! │                                                                         │
//! │  TravelSource::Routed { seconds }    ──► ceil(seconds / 60)            │
//! │  TravelSource::Heuristic { distance } ──► ceil(km × road / speed × 60) │
//! │  TravelSource::None (pickup, table)  ──► 0                  ──► travel │
//! │                                                                         │
//! │  total_min = prep + travel                                             │
//! │  total_max = total_min + window_spread                                 │
//! │                                                                         │
//! │  Invariant: total_max ≥ total_min ≥ prep                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::geo::Distance;

/// Minutes in a day; peak window bounds live in `0..MINUTES_PER_DAY`.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

// =============================================================================
// Peak Windows
// =============================================================================

/// A period of the day when the kitchen needs extra prep time.
///
/// Bounds are minutes since midnight, `start` inclusive and `end`
/// exclusive. A window with `start > end` wraps past midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PeakWindow {
    pub start_minute: u16,
    pub end_minute: u16,
    pub extra_prep_minutes: u32,
}

impl PeakWindow {
    /// Creates a window from `HH, MM` pairs.
    pub fn from_hm(start: (u16, u16), end: (u16, u16), extra_prep_minutes: u32) -> Self {
        PeakWindow {
            start_minute: start.0 * 60 + start.1,
            end_minute: end.0 * 60 + end.1,
            extra_prep_minutes,
        }
    }

    /// True if `minute_of_day` falls inside the window.
    pub fn contains(&self, minute_of_day: u16) -> bool {
        let m = minute_of_day % MINUTES_PER_DAY;
        if self.start_minute <= self.end_minute {
            m >= self.start_minute && m < self.end_minute
        } else {
            m >= self.start_minute || m < self.end_minute
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// ETA parameters of an establishment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EtaConfig {
    /// Prep time outside peak hours.
    pub base_prep_minutes: u32,

    /// Extra prep time during rush hours; overlapping windows add up.
    #[serde(default)]
    pub peak_windows: Vec<PeakWindow>,

    /// Average rider speed used by the heuristic.
    pub average_speed_kmh: f64,

    /// Ratio of road distance to straight-line distance.
    pub road_factor: f64,

    /// Width of the displayed window.
    pub window_spread_minutes: u32,
}

impl Default for EtaConfig {
    /// 20 min prep, +15 min at lunch and dinner, motorcycle at 25 km/h.
    fn default() -> Self {
        EtaConfig {
            base_prep_minutes: 20,
            peak_windows: vec![
                PeakWindow::from_hm((11, 30), (14, 0), 15),
                PeakWindow::from_hm((19, 0), (22, 0), 15),
            ],
            average_speed_kmh: 25.0,
            road_factor: 1.3,
            window_spread_minutes: 10,
        }
    }
}

impl EtaConfig {
    /// Checks the heuristic can produce finite travel times.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.average_speed_kmh.is_finite() || self.average_speed_kmh <= 0.0 {
            return Err(ValidationError::must_be_positive("average_speed_kmh"));
        }
        if !self.road_factor.is_finite() || self.road_factor < 1.0 {
            return Err(ValidationError::OutOfRange {
                field: "road_factor".to_string(),
                min: 1.0,
                max: f64::MAX,
            });
        }
        for window in &self.peak_windows {
            if window.start_minute >= MINUTES_PER_DAY || window.end_minute > MINUTES_PER_DAY {
                return Err(ValidationError::OutOfRange {
                    field: "peak_windows".to_string(),
                    min: 0.0,
                    max: MINUTES_PER_DAY as f64,
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// Calculations
// =============================================================================

/// Minutes since midnight for a wall-clock time.
pub fn minute_of_day(time: NaiveTime) -> u16 {
    (time.hour() * 60 + time.minute()) as u16
}

/// Prep time at a given minute of the day, peak adjustments included.
///
/// Saturates at `u32::MAX` instead of overflowing on a misconfigured
/// window.
pub fn prep_minutes_at(config: &EtaConfig, minute_of_day: u16) -> u32 {
    config
        .peak_windows
        .iter()
        .filter(|w| w.contains(minute_of_day))
        .fold(config.base_prep_minutes, |prep, w| {
            prep.saturating_add(w.extra_prep_minutes)
        })
}

/// Travel time estimated from straight-line distance.
///
/// ```rust
/// use entrega_core::eta::{heuristic_travel_minutes, EtaConfig};
/// use entrega_core::geo::Distance;
///
/// let config = EtaConfig::default(); // 25 km/h, road factor 1.3
/// // 5 km × 1.3 = 6.5 km at 25 km/h = 15.6 min → 16
/// assert_eq!(heuristic_travel_minutes(&config, Distance::from_km(5.0)), 16);
/// ```
pub fn heuristic_travel_minutes(config: &EtaConfig, distance: Distance) -> u32 {
    if distance.meters() == 0 || config.average_speed_kmh <= 0.0 {
        return 0;
    }
    let road_km = distance.km() * config.road_factor.max(1.0);
    let minutes = road_km / config.average_speed_kmh * 60.0;
    minutes.ceil().min(u32::MAX as f64) as u32
}

/// Where the travel time comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TravelSource {
    /// Duration returned by the routing provider.
    Routed { seconds: u64 },
    /// Straight-line distance, converted by the heuristic.
    Heuristic { distance: Distance },
    /// No travel (pickup, table, counter).
    None,
}

/// Which estimator produced the travel part of an [`EtaEstimate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum EtaSource {
    Routing,
    Heuristic,
    None,
}

/// Estimated delivery window in minutes from now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EtaEstimate {
    pub prep_minutes: u32,
    pub travel_minutes: u32,
    pub total_min_minutes: u32,
    pub total_max_minutes: u32,
    pub source: EtaSource,
}

impl EtaEstimate {
    /// Raises the window to at least `min..max` (zone or establishment
    /// advertised times), keeping `max ≥ min`.
    pub fn with_floor(mut self, min_minutes: u32, max_minutes: u32) -> Self {
        self.total_min_minutes = self.total_min_minutes.max(min_minutes);
        self.total_max_minutes = self
            .total_max_minutes
            .max(max_minutes)
            .max(self.total_min_minutes);
        self
    }

    /// Wall-clock window starting at `placed_at`.
    pub fn window_from(&self, placed_at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            placed_at + Duration::minutes(self.total_min_minutes as i64),
            placed_at + Duration::minutes(self.total_max_minutes as i64),
        )
    }
}

/// Combines prep and travel time into a display window.
pub fn estimate(config: &EtaConfig, minute_of_day: u16, travel: TravelSource) -> EtaEstimate {
    let prep = prep_minutes_at(config, minute_of_day);

    let (travel_minutes, source) = match travel {
        TravelSource::Routed { seconds } => {
            (seconds.div_ceil(60).min(u32::MAX as u64) as u32, EtaSource::Routing)
        }
        TravelSource::Heuristic { distance } => {
            (heuristic_travel_minutes(config, distance), EtaSource::Heuristic)
        }
        TravelSource::None => (0, EtaSource::None),
    };

    let total_min = prep.saturating_add(travel_minutes);
    let total_max = total_min.saturating_add(config.window_spread_minutes);

    EtaEstimate {
        prep_minutes: prep,
        travel_minutes,
        total_min_minutes: total_min,
        total_max_minutes: total_max,
        source,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_peak_window_contains() {
        let lunch = PeakWindow::from_hm((11, 30), (14, 0), 15);
        assert!(!lunch.contains(11 * 60 + 29));
        assert!(lunch.contains(11 * 60 + 30));
        assert!(lunch.contains(13 * 60 + 59));
        assert!(!lunch.contains(14 * 60));

        let late = PeakWindow::from_hm((23, 0), (1, 0), 10);
        assert!(late.contains(23 * 60 + 30));
        assert!(late.contains(30));
        assert!(!late.contains(60));
        assert!(!late.contains(22 * 60));
    }

    #[test]
    fn test_prep_adjusts_for_peak() {
        let config = EtaConfig::default();
        assert_eq!(prep_minutes_at(&config, 10 * 60), 20);
        assert_eq!(prep_minutes_at(&config, 12 * 60), 35);
        assert_eq!(prep_minutes_at(&config, 20 * 60), 35);
    }

    #[test]
    fn test_overlapping_windows_add_up() {
        let mut config = EtaConfig::default();
        config.peak_windows.push(PeakWindow::from_hm((12, 0), (13, 0), 5));
        assert_eq!(prep_minutes_at(&config, 12 * 60 + 15), 40);
    }

    #[test]
    fn test_prep_saturates() {
        let config = EtaConfig {
            base_prep_minutes: u32::MAX - 5,
            peak_windows: vec![
                PeakWindow::from_hm((0, 0), (23, 59), u32::MAX),
                PeakWindow::from_hm((0, 0), (23, 59), 10),
            ],
            ..EtaConfig::default()
        };
        assert_eq!(prep_minutes_at(&config, 12 * 60), u32::MAX);

        let eta = estimate(&config, 12 * 60, TravelSource::Routed { seconds: 600 });
        assert_eq!(eta.total_max_minutes, u32::MAX);
        assert!(eta.total_max_minutes >= eta.total_min_minutes);
    }

    #[test]
    fn test_routed_estimate() {
        let config = EtaConfig::default();
        let eta = estimate(&config, 10 * 60, TravelSource::Routed { seconds: 601 });
        assert_eq!(eta.prep_minutes, 20);
        assert_eq!(eta.travel_minutes, 11);
        assert_eq!(eta.total_min_minutes, 31);
        assert_eq!(eta.total_max_minutes, 41);
        assert_eq!(eta.source, EtaSource::Routing);
    }

    #[test]
    fn test_heuristic_estimate() {
        let config = EtaConfig::default();
        let eta = estimate(
            &config,
            10 * 60,
            TravelSource::Heuristic {
                distance: Distance::from_km(5.0),
            },
        );
        assert_eq!(eta.travel_minutes, 16);
        assert_eq!(eta.total_min_minutes, 36);
        assert_eq!(eta.source, EtaSource::Heuristic);
    }

    #[test]
    fn test_pickup_has_no_travel() {
        let config = EtaConfig::default();
        let eta = estimate(&config, 12 * 60, TravelSource::None);
        assert_eq!(eta.travel_minutes, 0);
        assert_eq!(eta.total_min_minutes, eta.prep_minutes);
        assert_eq!(eta.source, EtaSource::None);
    }

    #[test]
    fn test_with_floor() {
        let config = EtaConfig::default();
        let eta = estimate(&config, 10 * 60, TravelSource::None).with_floor(30, 50);
        assert_eq!(eta.total_min_minutes, 30);
        assert_eq!(eta.total_max_minutes, 50);

        let eta = estimate(&config, 10 * 60, TravelSource::Routed { seconds: 3600 })
            .with_floor(30, 50);
        assert_eq!(eta.total_min_minutes, 80);
        assert_eq!(eta.total_max_minutes, 90);
    }

    #[test]
    fn test_window_from() {
        let placed_at = DateTime::parse_from_rfc3339("2026-10-18T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let eta = estimate(&EtaConfig::default(), 10 * 60, TravelSource::None);
        let (from, to) = eta.window_from(placed_at);
        assert_eq!(from.to_rfc3339(), "2026-10-18T12:20:00+00:00");
        assert_eq!(to.to_rfc3339(), "2026-10-18T12:30:00+00:00");
    }

    #[test]
    fn test_minute_of_day() {
        let t = NaiveTime::from_hms_opt(19, 45, 59).unwrap();
        assert_eq!(minute_of_day(t), 19 * 60 + 45);
    }

    #[test]
    fn test_config_validation() {
        assert!(EtaConfig::default().validate().is_ok());
        let mut config = EtaConfig::default();
        config.average_speed_kmh = 0.0;
        assert!(config.validate().is_err());
        let mut config = EtaConfig::default();
        config.road_factor = 0.5;
        assert!(config.validate().is_err());
    }

    fn travel_strategy() -> impl Strategy<Value = TravelSource> {
        prop_oneof![
            (0u64..20_000).prop_map(|seconds| TravelSource::Routed { seconds }),
            (0u64..50_000).prop_map(|m| TravelSource::Heuristic {
                distance: Distance::from_meters(m)
            }),
            Just(TravelSource::None),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_window_is_ordered(
            base_prep in 0u32..120,
            spread in 0u32..60,
            minute in 0u16..MINUTES_PER_DAY,
            travel in travel_strategy(),
            floor_min in 0u32..120,
            floor_extra in 0u32..60,
        ) {
            let config = EtaConfig {
                base_prep_minutes: base_prep,
                window_spread_minutes: spread,
                ..EtaConfig::default()
            };
            let eta = estimate(&config, minute, travel);
            prop_assert!(eta.total_max_minutes >= eta.total_min_minutes);
            prop_assert!(eta.total_min_minutes >= eta.prep_minutes);
            prop_assert!(eta.prep_minutes >= base_prep);

            let floored = eta.with_floor(floor_min, floor_min + floor_extra);
            prop_assert!(floored.total_max_minutes >= floored.total_min_minutes);
            prop_assert!(floored.total_min_minutes >= floored.prep_minutes);
        }
    }
}
