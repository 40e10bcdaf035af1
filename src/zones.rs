use crate::models::{TimeSeriesPoint, ZoneThresholds};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Longest gap between two samples credited to a zone, in milliseconds
pub const MAX_GAP_MS: i64 = 10_000;

/// Errors that can occur while deriving zone thresholds
#[derive(Debug, thiserror::Error)]
pub enum ZoneError {
    #[error("Invalid threshold value: {0}")]
    InvalidThreshold(String),
}

/// Heart rate zones (5-zone model, zone 5 unbounded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HrZone {
    Zone1,
    Zone2,
    Zone3,
    Zone4,
    Zone5,
}

impl HrZone {
    pub fn number(&self) -> u8 {
        match self {
            HrZone::Zone1 => 1,
            HrZone::Zone2 => 2,
            HrZone::Zone3 => 3,
            HrZone::Zone4 => 4,
            HrZone::Zone5 => 5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HrZone::Zone1 => "Recovery",
            HrZone::Zone2 => "Aerobic",
            HrZone::Zone3 => "Tempo",
            HrZone::Zone4 => "Threshold",
            HrZone::Zone5 => "VO2 Max",
        }
    }
}

impl fmt::Display for HrZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Z{} {}", self.number(), self.label())
    }
}

/// Zone threshold utilities
pub struct ZoneCalculator;

impl ZoneCalculator {
    /// Determine which heart rate zone a given HR falls into
    ///
    /// Each zone's upper bound is inclusive.
    pub fn get_heart_rate_zone(hr: f64, zones: &ZoneThresholds) -> HrZone {
        if hr <= f64::from(zones.zone1_max) {
            HrZone::Zone1
        } else if hr <= f64::from(zones.zone2_max) {
            HrZone::Zone2
        } else if hr <= f64::from(zones.zone3_max) {
            HrZone::Zone3
        } else if hr <= f64::from(zones.zone4_max) {
            HrZone::Zone4
        } else {
            HrZone::Zone5
        }
    }

    /// Derive thresholds from maximum heart rate
    ///
    /// - Z1: ≤ 68% MaxHR (Recovery)
    /// - Z2: ≤ 83% MaxHR (Aerobic)
    /// - Z3: ≤ 89% MaxHR (Tempo)
    /// - Z4: ≤ 94% MaxHR (Threshold)
    /// - Z5: above (VO2 Max)
    ///
    /// FTP and target weight are carried over from `base`.
    pub fn thresholds_from_max_hr(max_hr: u16, base: &ZoneThresholds) -> Result<ZoneThresholds, ZoneError> {
        if !(100..=230).contains(&max_hr) {
            return Err(ZoneError::InvalidThreshold(format!(
                "Max HR must be between 100 and 230 bpm, got {}",
                max_hr
            )));
        }

        let max_hr = Decimal::from(max_hr);
        Ok(ZoneThresholds {
            zone1_max: Self::percentage_of(max_hr, dec!(0.68)),
            zone2_max: Self::percentage_of(max_hr, dec!(0.83)),
            zone3_max: Self::percentage_of(max_hr, dec!(0.89)),
            zone4_max: Self::percentage_of(max_hr, dec!(0.94)),
            ..base.clone()
        })
    }

    fn percentage_of(value: Decimal, percentage: Decimal) -> u16 {
        use rust_decimal::prelude::ToPrimitive;
        (value * percentage).round().to_u16().unwrap_or(u16::MAX)
    }
}

/// Time spent in each heart rate zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDistribution {
    /// Minutes per zone; zones with no time are omitted
    pub minutes: BTreeMap<HrZone, Decimal>,

    /// Sum of all zone minutes
    pub total_minutes: Decimal,
}

impl ZoneDistribution {
    pub fn empty() -> Self {
        ZoneDistribution {
            minutes: BTreeMap::new(),
            total_minutes: Decimal::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.minutes.is_empty()
    }

    /// Minutes spent in `zone` (zero when the zone was never visited)
    pub fn minutes_in(&self, zone: HrZone) -> Decimal {
        self.minutes.get(&zone).copied().unwrap_or(Decimal::ZERO)
    }

    /// Share of total time in `zone`, as a percentage
    pub fn percent_in(&self, zone: HrZone) -> Decimal {
        if self.total_minutes.is_zero() {
            return Decimal::ZERO;
        }
        self.minutes_in(zone) / self.total_minutes * dec!(100)
    }
}

/// Zone distribution analysis utilities
pub struct ZoneAnalyzer;

impl ZoneAnalyzer {
    /// Time-weighted zone distribution of a chronologically sorted HR series
    ///
    /// The time between two consecutive samples is credited to the zone of the
    /// earlier sample, with any single gap capped at [`MAX_GAP_MS`] so a
    /// telemetry dropout cannot inflate one zone. Fewer than two samples give
    /// an empty distribution.
    pub fn analyze_hr_distribution(samples: &[TimeSeriesPoint], zones: &ZoneThresholds) -> ZoneDistribution {
        if samples.len() < 2 {
            return ZoneDistribution::empty();
        }

        let mut zone_ms: BTreeMap<HrZone, i64> = BTreeMap::new();

        for pair in samples.windows(2) {
            let (earlier, later) = (&pair[0], &pair[1]);
            if !earlier.value.is_finite() {
                continue;
            }

            let gap_ms = (later.timestamp - earlier.timestamp)
                .num_milliseconds()
                .clamp(0, MAX_GAP_MS);
            if gap_ms == 0 {
                continue;
            }

            let zone = ZoneCalculator::get_heart_rate_zone(earlier.value, zones);
            *zone_ms.entry(zone).or_insert(0) += gap_ms;
        }

        let minutes: BTreeMap<HrZone, Decimal> = zone_ms
            .into_iter()
            .filter(|(_, ms)| *ms > 0)
            .map(|(zone, ms)| (zone, Decimal::from(ms) / dec!(60000)))
            .collect();
        let total_minutes = minutes.values().copied().sum();

        ZoneDistribution {
            minutes,
            total_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 4, 7, 0, 0).unwrap()
    }

    fn series(points: &[(i64, f64)]) -> Vec<TimeSeriesPoint> {
        points
            .iter()
            .map(|(secs, hr)| TimeSeriesPoint::new(start() + Duration::seconds(*secs), *hr))
            .collect()
    }

    fn zones() -> ZoneThresholds {
        ZoneThresholds {
            zone1_max: 140,
            zone2_max: 160,
            zone3_max: 170,
            zone4_max: 180,
            ..ZoneThresholds::default()
        }
    }

    #[test]
    fn test_zone_detection() {
        let zones = zones();
        assert_eq!(ZoneCalculator::get_heart_rate_zone(100.0, &zones), HrZone::Zone1);
        assert_eq!(ZoneCalculator::get_heart_rate_zone(140.0, &zones), HrZone::Zone1);
        assert_eq!(ZoneCalculator::get_heart_rate_zone(140.5, &zones), HrZone::Zone2);
        assert_eq!(ZoneCalculator::get_heart_rate_zone(175.0, &zones), HrZone::Zone4);
        assert_eq!(ZoneCalculator::get_heart_rate_zone(199.0, &zones), HrZone::Zone5);
    }

    #[test]
    fn test_transition_attributed_to_earlier_sample() {
        let samples = series(&[(0, 100.0), (60, 160.0), (120, 100.0)]);
        let distribution = ZoneAnalyzer::analyze_hr_distribution(&samples, &zones());

        // Each 60s gap is capped at 10s; the first goes to Z1, the second to Z2
        assert_eq!(distribution.minutes.len(), 2);
        let ten_seconds = Decimal::from(10_000) / dec!(60000);
        assert_eq!(distribution.minutes_in(HrZone::Zone1), ten_seconds);
        assert_eq!(distribution.minutes_in(HrZone::Zone2), ten_seconds);
        assert_eq!(distribution.minutes_in(HrZone::Zone3), Decimal::ZERO);
    }

    #[test]
    fn test_dense_series_totals_elapsed_span() {
        // One sample per second for two minutes, crossing zone 1 into zone 2 at 60s
        let points: Vec<(i64, f64)> = (0..=120)
            .map(|s| (s, if s < 60 { 130.0 } else { 150.0 }))
            .collect();
        let distribution = ZoneAnalyzer::analyze_hr_distribution(&series(&points), &zones());

        assert_eq!(distribution.total_minutes, dec!(2));
        assert_eq!(distribution.minutes_in(HrZone::Zone1), dec!(1));
        assert_eq!(distribution.minutes_in(HrZone::Zone2), dec!(1));
        assert_eq!(distribution.percent_in(HrZone::Zone1), dec!(50));
    }

    #[test]
    fn test_gap_cap() {
        let samples = series(&[(0, 185.0), (5, 185.0), (305, 185.0)]);
        let distribution = ZoneAnalyzer::analyze_hr_distribution(&samples, &zones());
        assert_eq!(distribution.minutes_in(HrZone::Zone5), dec!(15) / dec!(60));
    }

    #[test]
    fn test_zero_duration_zones_omitted() {
        let samples = series(&[(0, 120.0), (5, 120.0), (10, 120.0)]);
        let distribution = ZoneAnalyzer::analyze_hr_distribution(&samples, &zones());
        assert_eq!(distribution.minutes.keys().copied().collect::<Vec<_>>(), vec![HrZone::Zone1]);
    }

    #[test]
    fn test_zone_distribution_empty_data() {
        let zones = zones();
        assert!(ZoneAnalyzer::analyze_hr_distribution(&[], &zones).is_empty());
        let single = series(&[(0, 150.0)]);
        let distribution = ZoneAnalyzer::analyze_hr_distribution(&single, &zones);
        assert!(distribution.is_empty());
        assert_eq!(distribution.total_minutes, Decimal::ZERO);
        assert_eq!(distribution.percent_in(HrZone::Zone1), Decimal::ZERO);
    }

    #[test]
    fn test_thresholds_from_max_hr() {
        let base = ZoneThresholds::default();
        let zones = ZoneCalculator::thresholds_from_max_hr(190, &base).unwrap();
        assert_eq!(zones.zone1_max, 129); // 129.2
        assert_eq!(zones.zone2_max, 158); // 157.7
        assert_eq!(zones.zone3_max, 169); // 169.1
        assert_eq!(zones.zone4_max, 179); // 178.6
        assert_eq!(zones.functional_threshold_power, base.functional_threshold_power);

        assert!(ZoneCalculator::thresholds_from_max_hr(60, &base).is_err());
    }

    #[test]
    fn test_zone_display() {
        assert_eq!(HrZone::Zone4.to_string(), "Z4 Threshold");
    }
}
