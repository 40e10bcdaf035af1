//! Rolling training-load profile
//!
//! Session load is `duration_minutes × rpe` (session-RPE). The acute load is the
//! mean daily load over the trailing 7 days ending today, the chronic load the
//! mean over the trailing 28 days, and their ratio flags overreaching or
//! detraining.

use crate::models::SessionRecord;
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Summed session-RPE load for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLoad {
    /// Date of the training day
    pub date: NaiveDate,

    /// Total load for the day (sum of all sessions)
    pub total_load: Decimal,

    /// Number of sessions completed on this day
    pub session_count: u16,
}

/// Strain ratio classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrainFlag {
    /// Acute load well below chronic load (detraining)
    Low,
    Normal,
    /// Acute load well above chronic load (overreaching)
    High,
}

impl StrainFlag {
    /// Get flag description
    pub fn description(&self) -> &'static str {
        match self {
            StrainFlag::Low => "Detraining (recent load well below usual)",
            StrainFlag::Normal => "Balanced load",
            StrainFlag::High => "Overreaching (recent load spike)",
        }
    }
}

impl fmt::Display for StrainFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrainFlag::Low => write!(f, "low"),
            StrainFlag::Normal => write!(f, "normal"),
            StrainFlag::High => write!(f, "high"),
        }
    }
}

/// Short/long window load profile relative to one day
///
/// Derived on demand and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadProfile {
    /// Mean daily load over the acute window
    pub acute_load: Decimal,

    /// Mean daily load over the chronic window
    pub chronic_load: Decimal,

    /// Acute over chronic load; 1.0 when history is insufficient
    pub strain_ratio: Decimal,

    pub strain_flag: StrainFlag,
}

impl LoadProfile {
    /// Profile with no load and no penalty
    pub fn neutral() -> Self {
        LoadProfile {
            acute_load: Decimal::ZERO,
            chronic_load: Decimal::ZERO,
            strain_ratio: Decimal::ONE,
            strain_flag: StrainFlag::Normal,
        }
    }
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Load window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Acute window in days, including today (default: 7)
    pub acute_window_days: u16,

    /// Chronic window in days, including today (default: 28)
    pub chronic_window_days: u16,

    /// Ratio above which the flag is `High`
    pub high_strain_ratio: Decimal,

    /// Ratio below which the flag is `Low`
    pub low_strain_ratio: Decimal,

    /// Sessions required inside the chronic window before the ratio is trusted
    pub min_sessions: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            acute_window_days: 7,
            chronic_window_days: 28,
            high_strain_ratio: dec!(1.5),
            low_strain_ratio: dec!(0.8),
            min_sessions: 2,
        }
    }
}

/// Load profile calculation engine
#[derive(Debug, Clone, Default)]
pub struct LoadCalculator {
    config: LoadConfig,
}

impl LoadCalculator {
    /// Create new load calculator with default configuration
    pub fn new() -> Self {
        LoadCalculator {
            config: LoadConfig::default(),
        }
    }

    /// Create new load calculator with custom configuration
    pub fn with_config(config: LoadConfig) -> Self {
        LoadCalculator { config }
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Session-RPE load of a single session
    pub fn session_load(session: &SessionRecord) -> Decimal {
        session.duration_minutes * Decimal::from(session.rpe)
    }

    /// Aggregate daily load from a collection of sessions
    pub fn aggregate_daily_load(&self, sessions: &[SessionRecord]) -> BTreeMap<NaiveDate, DailyLoad> {
        let mut daily_load: BTreeMap<NaiveDate, DailyLoad> = BTreeMap::new();

        for session in sessions {
            let load = Self::session_load(session);

            daily_load
                .entry(session.date)
                .and_modify(|day| {
                    day.total_load += load;
                    day.session_count += 1;
                })
                .or_insert(DailyLoad {
                    date: session.date,
                    total_load: load,
                    session_count: 1,
                });
        }

        daily_load
    }

    /// Calculate the load profile as of `today`
    ///
    /// Sessions dated after `today` or before the chronic window are ignored.
    pub fn calculate_profile(&self, sessions: &[SessionRecord], today: NaiveDate) -> LoadProfile {
        let acute_start = Self::window_start(today, self.config.acute_window_days);
        let chronic_start = Self::window_start(today, self.config.chronic_window_days);

        let daily_load = self.aggregate_daily_load(sessions);
        let in_window = daily_load.range(chronic_start..=today);

        let mut acute_total = Decimal::ZERO;
        let mut chronic_total = Decimal::ZERO;
        let mut session_count = 0usize;

        for (date, day) in in_window {
            chronic_total += day.total_load;
            session_count += day.session_count as usize;
            if *date >= acute_start {
                acute_total += day.total_load;
            }
        }

        let acute_load = Self::daily_mean(acute_total, self.config.acute_window_days);
        let chronic_load = Self::daily_mean(chronic_total, self.config.chronic_window_days);

        if chronic_load.is_zero() || session_count < self.config.min_sessions {
            debug!(
                %today,
                session_count,
                "insufficient load history, using neutral strain ratio"
            );
            return LoadProfile {
                acute_load,
                chronic_load,
                strain_ratio: Decimal::ONE,
                strain_flag: StrainFlag::Normal,
            };
        }

        let strain_ratio = acute_load / chronic_load;
        let strain_flag = self.classify(strain_ratio);

        debug!(
            %today,
            %acute_load,
            %chronic_load,
            %strain_ratio,
            %strain_flag,
            "load profile calculated"
        );

        LoadProfile {
            acute_load,
            chronic_load,
            strain_ratio,
            strain_flag,
        }
    }

    /// Classify a strain ratio against the configured thresholds
    pub fn classify(&self, strain_ratio: Decimal) -> StrainFlag {
        if strain_ratio > self.config.high_strain_ratio {
            StrainFlag::High
        } else if strain_ratio < self.config.low_strain_ratio {
            StrainFlag::Low
        } else {
            StrainFlag::Normal
        }
    }

    /// First day of a window of `days` days ending on (and including) `today`
    fn window_start(today: NaiveDate, days: u16) -> NaiveDate {
        let span = u64::from(days.max(1) - 1);
        today.checked_sub_days(Days::new(span)).unwrap_or(NaiveDate::MIN)
    }

    fn daily_mean(total: Decimal, days: u16) -> Decimal {
        if days == 0 {
            return Decimal::ZERO;
        }
        total / Decimal::from(days)
    }
}
