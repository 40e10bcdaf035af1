//! Biometric and telemetry provider seam
//!
//! The platform health-data API lives outside this crate. Implementations may
//! return empty or partial data on failure; the helpers here turn that into a
//! [`DataUnavailableFault`] that callers log and replace with neutral defaults.

use crate::error::DataUnavailableFault;
use crate::models::{
    DailyEnergy, DailyMacros, EnergyBalance, Metric, TimeSeriesPoint, WorkoutSummary,
};
use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Read-only source of biometrics and session telemetry
pub trait TelemetryProvider {
    /// Summary of the most recently recorded workout
    fn fetch_latest_workout_summary(&self) -> Option<WorkoutSummary>;

    /// Ordered samples of `metric` in `[start, start + duration_minutes)`
    fn fetch_time_series(
        &self,
        metric: Metric,
        start: DateTime<Utc>,
        duration_minutes: u32,
    ) -> Vec<TimeSeriesPoint>;

    /// Macronutrient totals logged today
    fn fetch_daily_macros(&self) -> DailyMacros;

    /// Today's energy intake against expenditure
    fn fetch_energy_balance(&self) -> EnergyBalance;

    /// Net energy balance for each of the last `days_back` days, oldest first
    fn fetch_historical_energy_balance(&self, days_back: u32) -> Vec<DailyEnergy>;
}

/// Provider backed by data already in memory
///
/// Used by the CLI (loaded from a JSON snapshot) and in tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryProvider {
    pub latest_workout: Option<WorkoutSummary>,
    pub series: HashMap<Metric, Vec<TimeSeriesPoint>>,
    pub macros: DailyMacros,
    pub energy: EnergyBalance,
    pub energy_history: Vec<DailyEnergy>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, metric: Metric, points: Vec<TimeSeriesPoint>) -> Self {
        self.series.insert(metric, points);
        self
    }

    pub fn with_energy_history(mut self, history: Vec<DailyEnergy>) -> Self {
        self.energy_history = history;
        self
    }
}

impl TelemetryProvider for InMemoryProvider {
    fn fetch_latest_workout_summary(&self) -> Option<WorkoutSummary> {
        self.latest_workout.clone()
    }

    fn fetch_time_series(
        &self,
        metric: Metric,
        start: DateTime<Utc>,
        duration_minutes: u32,
    ) -> Vec<TimeSeriesPoint> {
        let end = start + Duration::minutes(i64::from(duration_minutes));
        let mut points: Vec<TimeSeriesPoint> = self
            .series
            .get(&metric)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.timestamp >= start && p.timestamp < end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        points.sort_by_key(|p| p.timestamp);
        points
    }

    fn fetch_daily_macros(&self) -> DailyMacros {
        self.macros
    }

    fn fetch_energy_balance(&self) -> EnergyBalance {
        self.energy
    }

    fn fetch_historical_energy_balance(&self, days_back: u32) -> Vec<DailyEnergy> {
        let mut history = self.energy_history.clone();
        history.sort_by_key(|d| d.date);
        let skip = history.len().saturating_sub(days_back as usize);
        history.split_off(skip)
    }
}

/// Fetch a series, reporting an empty result as unavailable
pub fn fetch_series<P: TelemetryProvider + ?Sized>(
    provider: &P,
    metric: Metric,
    start: DateTime<Utc>,
    duration_minutes: u32,
) -> Result<Vec<TimeSeriesPoint>, DataUnavailableFault> {
    let points = provider.fetch_time_series(metric, start, duration_minutes);
    if points.is_empty() {
        return Err(DataUnavailableFault::new(
            metric.to_string(),
            format!("no samples from {} over {} min", start, duration_minutes),
        ));
    }
    Ok(points)
}

/// Fetch a series, substituting an empty series when nothing is available
pub fn fetch_series_or_empty<P: TelemetryProvider + ?Sized>(
    provider: &P,
    metric: Metric,
    start: DateTime<Utc>,
    duration_minutes: u32,
) -> Vec<TimeSeriesPoint> {
    fetch_series(provider, metric, start, duration_minutes).unwrap_or_else(|fault| {
        warn!(%fault, "time series unavailable, continuing without it");
        Vec::new()
    })
}

/// Yesterday's net energy balance relative to `today`, if the provider has it
pub fn yesterday_net_balance<P: TelemetryProvider + ?Sized>(
    provider: &P,
    today: NaiveDate,
) -> Option<f64> {
    let yesterday = today.checked_sub_days(Days::new(1))?;
    let net = provider
        .fetch_historical_energy_balance(2)
        .into_iter()
        .find(|day| day.date == yesterday)
        .map(|day| day.net)
        .filter(|net| net.is_finite());

    if net.is_none() {
        warn!(%yesterday, "no energy balance for yesterday, skipping fuelling adjustment");
    }
    net
}

/// Every metric of one session, fetched together
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSeries {
    pub heart_rate: Vec<TimeSeriesPoint>,
    pub power: Vec<TimeSeriesPoint>,
    pub cadence: Vec<TimeSeriesPoint>,
    pub ground_contact_time: Vec<TimeSeriesPoint>,
    pub vertical_oscillation: Vec<TimeSeriesPoint>,
}

impl SessionSeries {
    /// Fetch all metrics for a session window; missing metrics come back empty
    pub fn fetch<P: TelemetryProvider + ?Sized>(
        provider: &P,
        start: DateTime<Utc>,
        duration_minutes: u32,
    ) -> Self {
        SessionSeries {
            heart_rate: fetch_series_or_empty(provider, Metric::HeartRate, start, duration_minutes),
            power: fetch_series_or_empty(provider, Metric::Power, start, duration_minutes),
            cadence: fetch_series_or_empty(provider, Metric::Cadence, start, duration_minutes),
            ground_contact_time: fetch_series_or_empty(
                provider,
                Metric::GroundContactTime,
                start,
                duration_minutes,
            ),
            vertical_oscillation: fetch_series_or_empty(
                provider,
                Metric::VerticalOscillation,
                start,
                duration_minutes,
            ),
        }
    }

    /// Values only, timestamps dropped
    pub fn values(points: &[TimeSeriesPoint]) -> Vec<f64> {
        points.iter().map(|p| p.value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 10, 6, 30, 0).unwrap()
    }

    fn points(metric_offset: f64, count: i64) -> Vec<TimeSeriesPoint> {
        (0..count)
            .rev()
            .map(|i| TimeSeriesPoint::new(start() + Duration::seconds(i * 5), metric_offset + i as f64))
            .collect()
    }

    #[test]
    fn test_time_series_window_and_order() {
        let provider = InMemoryProvider::new().with_series(Metric::HeartRate, points(120.0, 30));

        // 1 minute window keeps the first 12 samples (0..55s), sorted
        let fetched = provider.fetch_time_series(Metric::HeartRate, start(), 1);
        assert_eq!(fetched.len(), 12);
        assert!(fetched.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(fetched[0].value, 120.0);
    }

    #[test]
    fn test_empty_series_is_unavailable() {
        let provider = InMemoryProvider::new();
        let fault = fetch_series(&provider, Metric::Power, start(), 60).unwrap_err();
        assert_eq!(fault.metric, "power");
        assert!(fetch_series_or_empty(&provider, Metric::Power, start(), 60).is_empty());
    }

    #[test]
    fn test_session_series_partial() {
        let provider = InMemoryProvider::new().with_series(Metric::HeartRate, points(130.0, 10));
        let series = SessionSeries::fetch(&provider, start(), 60);
        assert_eq!(series.heart_rate.len(), 10);
        assert!(series.power.is_empty());
        assert!(series.vertical_oscillation.is_empty());
        assert_eq!(SessionSeries::values(&series.heart_rate)[9], 139.0);
    }

    #[test]
    fn test_yesterday_net_balance() {
        let today = NaiveDate::from_ymd_opt(2024, 8, 10).unwrap();
        let provider = InMemoryProvider::new().with_energy_history(vec![
            DailyEnergy { date: NaiveDate::from_ymd_opt(2024, 8, 8).unwrap(), net: 100.0 },
            DailyEnergy { date: NaiveDate::from_ymd_opt(2024, 8, 9).unwrap(), net: -750.0 },
            DailyEnergy { date: today, net: 20.0 },
        ]);

        // Only the last two days are requested: yesterday and today
        assert_eq!(yesterday_net_balance(&provider, today), Some(-750.0));
        assert_eq!(
            yesterday_net_balance(&provider, NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()),
            None
        );
    }

    #[test]
    fn test_historical_balance_is_most_recent_days() {
        let provider = InMemoryProvider::new().with_energy_history(
            (1..=5)
                .map(|d| DailyEnergy {
                    date: NaiveDate::from_ymd_opt(2024, 8, d).unwrap(),
                    net: f64::from(d),
                })
                .collect(),
        );
        let history = provider.fetch_historical_energy_balance(2);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].net, 4.0);
        assert_eq!(history[1].net, 5.0);
    }
}
