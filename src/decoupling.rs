//! Aerobic decoupling (Pw:HR drift)
//!
//! Splits a steady-state session in two halves and compares the efficiency
//! factor `EF = mean(power) / mean(heart rate)` of each. A falling EF in the
//! second half means more heartbeats for the same output: cardiovascular
//! drift.
//!
//! Only meaningful for steady efforts. Interval sessions produce numbers, but
//! the numbers mean nothing; callers decide which sessions qualify.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;
use tracing::debug;

/// Minimum samples required in each series
pub const MIN_SAMPLES: usize = 21;

/// Drift (percent) above which a session is flagged
pub const DRIFT_THRESHOLD_PCT: f64 = 5.0;

/// Decoupling classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecouplingStatus {
    /// Decoupling at or below the threshold
    Stable,
    /// Decoupling above the threshold, fatigue likely
    Drift,
}

impl fmt::Display for DecouplingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecouplingStatus::Stable => write!(f, "Efficient / stable"),
            DecouplingStatus::Drift => write!(f, "Drift / fatigue"),
        }
    }
}

/// Result of a decoupling analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decoupling {
    pub first_half_ef: f64,
    pub second_half_ef: f64,
    /// `(EF_first - EF_second) / EF_first × 100`
    pub decoupling_pct: f64,
    pub status: DecouplingStatus,
}

/// Aerobic decoupling calculator
pub struct DecouplingAnalyzer;

impl DecouplingAnalyzer {
    /// Compute decoupling from aligned heart-rate and power series
    ///
    /// Returns `None` ("not computable") when either series has fewer than
    /// [`MIN_SAMPLES`] samples, when a half's mean heart rate is not positive,
    /// or when the first-half EF is zero.
    pub fn analyze(heart_rate: &[f64], power: &[f64]) -> Option<Decoupling> {
        if heart_rate.len() < MIN_SAMPLES || power.len() < MIN_SAMPLES {
            debug!(
                hr_samples = heart_rate.len(),
                power_samples = power.len(),
                "too few samples for decoupling"
            );
            return None;
        }

        let (hr_first, hr_second) = heart_rate.split_at(heart_rate.len() / 2);
        let (power_first, power_second) = power.split_at(power.len() / 2);

        let first_half_ef = Self::efficiency_factor(power_first, hr_first)?;
        let second_half_ef = Self::efficiency_factor(power_second, hr_second)?;

        if first_half_ef == 0.0 {
            return None;
        }

        let decoupling_pct = (first_half_ef - second_half_ef) / first_half_ef * 100.0;
        if !decoupling_pct.is_finite() {
            return None;
        }

        Some(Decoupling {
            first_half_ef,
            second_half_ef,
            decoupling_pct,
            status: Self::classify(decoupling_pct),
        })
    }

    /// Classify a decoupling percentage
    pub fn classify(decoupling_pct: f64) -> DecouplingStatus {
        if decoupling_pct <= DRIFT_THRESHOLD_PCT {
            DecouplingStatus::Stable
        } else {
            DecouplingStatus::Drift
        }
    }

    /// Mean power over mean heart rate; `None` unless mean heart rate is positive
    fn efficiency_factor(power: &[f64], heart_rate: &[f64]) -> Option<f64> {
        let mean_hr = mean(heart_rate)?;
        if mean_hr <= 0.0 {
            return None;
        }
        Some(mean(power)? / mean_hr)
    }
}

/// `None` for an empty slice or a non-finite mean
fn mean(values: &[f64]) -> Option<f64> {
    let mean = values.iter().mean();
    mean.is_finite().then_some(mean)
}
