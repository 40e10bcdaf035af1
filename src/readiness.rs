//! Daily readiness scoring
//!
//! Combines today's biometrics with rolling personal baselines, the training
//! load profile and yesterday's energy balance into a 0-100 readiness score.
//!
//! # Model
//!
//! Each available signal is mapped to a sub-score in `[0, 1]`:
//!
//! - **HRV**: `0.5 + (hrv - baseline) / (2 × sensitivity)`, so a reading at
//!   baseline is neutral and `±sensitivity` ms saturates
//! - **Resting HR**: mirrored, a resting HR above baseline lowers the score
//! - **Sleep**: `sleep_hours / 8`, clamped
//! - **RMSSD** (optional protocol): same shape as HRV against its own baseline
//! - **Subjective readiness** (optional, 1-10): linear
//!
//! The composite is the weighted mean of the sub-scores that are present,
//! re-normalised over their weights, scaled to 100. Absent signals drop out of
//! the mean rather than counting as zero; with nothing present the composite
//! is the neutral 50.
//!
//! ## Calibration
//!
//! HRV, resting HR and RMSSD are relative signals: a reading at baseline is
//! worth 0.5. Sleep and subjective readiness are absolute: eight hours of
//! sleep is worth 1.0. Dropping a relative signal therefore moves the
//! composite toward the absolute ones rather than toward 50. A day with HRV
//! and resting HR exactly at baseline and eight hours of sleep scores 64;
//! the same day reported as sleep alone scores 100. Providers that report
//! HRV or resting HR should always send them, so that day-to-day scores stay
//! comparable.
//!
//! Point penalties for strain (overreaching > detraining)
//! and for a severe energy deficit the previous day are then subtracted.
//!
//! Baselines come from the trailing window of history. With fewer than
//! `min_baseline_samples` readings of a metric, fixed population constants
//! are used instead of a small-sample mean.

use crate::load::{LoadProfile, StrainFlag};
use crate::models::BiometricSample;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;
use tracing::debug;

/// Readiness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Trailing days of history used for baselines
    pub baseline_window_days: u16,

    /// Readings of a metric required before its baseline is trusted
    pub min_baseline_samples: usize,

    /// Population HRV baseline in milliseconds
    pub population_hrv_ms: f64,

    /// Population resting heart rate baseline in bpm
    pub population_resting_hr: f64,

    /// Population RMSSD baseline in milliseconds
    pub population_rmssd_ms: f64,

    /// HRV deviation (ms) that saturates the HRV sub-score
    pub hrv_sensitivity_ms: f64,

    /// Resting HR deviation (bpm) that saturates the resting HR sub-score
    pub resting_hr_sensitivity: f64,

    /// RMSSD deviation (ms) that saturates the RMSSD sub-score
    pub rmssd_sensitivity_ms: f64,

    /// Sleep duration that earns a full sleep sub-score
    pub target_sleep_hours: f64,

    pub weights: ReadinessWeights,

    /// Points removed when the strain flag is `High`
    pub overreaching_penalty: f64,

    /// Points removed when the strain flag is `Low`
    pub detraining_penalty: f64,

    /// Net energy balance (kcal) at or below which the deficit is severe
    pub severe_deficit_kcal: f64,

    /// Points removed after a severe energy deficit
    pub deficit_penalty: f64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        ReadinessConfig {
            baseline_window_days: 28,
            min_baseline_samples: 7,
            population_hrv_ms: 65.0,
            population_resting_hr: 55.0,
            population_rmssd_ms: 45.0,
            hrv_sensitivity_ms: 20.0,
            resting_hr_sensitivity: 8.0,
            rmssd_sensitivity_ms: 15.0,
            target_sleep_hours: 8.0,
            weights: ReadinessWeights::default(),
            overreaching_penalty: 15.0,
            detraining_penalty: 5.0,
            severe_deficit_kcal: -500.0,
            deficit_penalty: 10.0,
        }
    }
}

/// Relative weight of each sub-score in the composite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessWeights {
    pub hrv: f64,
    pub resting_hr: f64,
    pub sleep: f64,
    pub rmssd: f64,
    pub subjective: f64,
}

impl Default for ReadinessWeights {
    fn default() -> Self {
        ReadinessWeights {
            hrv: 0.30,
            resting_hr: 0.20,
            sleep: 0.20,
            rmssd: 0.15,
            subjective: 0.15,
        }
    }
}

/// Where a baseline value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineSource {
    /// Mean of the athlete's own trailing readings
    History,
    /// Fixed population constant (too little history)
    Population,
}

/// Personal baselines used for one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baselines {
    pub hrv: f64,
    pub hrv_source: BaselineSource,
    pub resting_hr: f64,
    pub resting_hr_source: BaselineSource,
    pub rmssd: f64,
    pub rmssd_source: BaselineSource,
}

/// Individual sub-scores in `[0, 1]`; `None` when the input was absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub hrv: Option<f64>,
    pub resting_hr: Option<f64>,
    pub sleep: Option<f64>,
    pub rmssd: Option<f64>,
    pub subjective: Option<f64>,
}

/// Readiness category derived from the final score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessCategory {
    /// 80-100
    Primed,
    /// 65-79
    Ready,
    /// 40-64
    Moderate,
    /// 0-39
    Fatigued,
}

impl ReadinessCategory {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => ReadinessCategory::Primed,
            65..=79 => ReadinessCategory::Ready,
            40..=64 => ReadinessCategory::Moderate,
            _ => ReadinessCategory::Fatigued,
        }
    }
}

impl fmt::Display for ReadinessCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessCategory::Primed => write!(f, "Primed"),
            ReadinessCategory::Ready => write!(f, "Ready"),
            ReadinessCategory::Moderate => write!(f, "Moderate"),
            ReadinessCategory::Fatigued => write!(f, "Fatigued"),
        }
    }
}

/// Everything that goes into one readiness evaluation
#[derive(Debug, Clone, Copy)]
pub struct ReadinessInputs<'a> {
    /// Today's sample, possibly partially filled
    pub today: &'a BiometricSample,

    /// Prior samples; entries on or after `today.date` are ignored
    pub history: &'a [BiometricSample],

    pub load: &'a LoadProfile,

    /// Yesterday's net energy balance in kcal, if known
    pub yesterday_net_energy: Option<f64>,
}

/// Full readiness result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessBreakdown {
    /// Final score, 0-100
    pub score: u8,
    pub category: ReadinessCategory,
    pub baselines: Baselines,
    pub sub_scores: SubScores,
    /// Weighted composite before penalties, 0-100
    pub composite: f64,
    pub load_penalty: f64,
    pub energy_penalty: f64,
}

/// Readiness calculation engine
#[derive(Debug, Clone, Default)]
pub struct ReadinessCalculator {
    config: ReadinessConfig,
}

impl ReadinessCalculator {
    pub fn new() -> Self {
        ReadinessCalculator {
            config: ReadinessConfig::default(),
        }
    }

    pub fn with_config(config: ReadinessConfig) -> Self {
        ReadinessCalculator { config }
    }

    pub fn config(&self) -> &ReadinessConfig {
        &self.config
    }

    /// Readiness score in `[0, 100]`
    pub fn score(&self, inputs: &ReadinessInputs<'_>) -> u8 {
        self.calculate(inputs).score
    }

    /// Calculate the readiness score with its components
    pub fn calculate(&self, inputs: &ReadinessInputs<'_>) -> ReadinessBreakdown {
        let today = inputs.today;
        let baselines = self.baselines(inputs.history, today.date);
        let sub_scores = self.sub_scores(today, &baselines);
        let composite = self.composite(&sub_scores);

        let load_penalty = match inputs.load.strain_flag {
            StrainFlag::High => self.config.overreaching_penalty,
            StrainFlag::Low => self.config.detraining_penalty,
            StrainFlag::Normal => 0.0,
        };

        let energy_penalty = match inputs.yesterday_net_energy {
            Some(net) if net.is_finite() && net <= self.config.severe_deficit_kcal => {
                self.config.deficit_penalty
            }
            _ => 0.0,
        };

        let score = (composite - load_penalty - energy_penalty)
            .clamp(0.0, 100.0)
            .round() as u8;

        debug!(
            date = %today.date,
            composite,
            load_penalty,
            energy_penalty,
            score,
            "readiness calculated"
        );

        ReadinessBreakdown {
            score,
            category: ReadinessCategory::from_score(score),
            baselines,
            sub_scores,
            composite,
            load_penalty,
            energy_penalty,
        }
    }

    /// Rolling baselines from the samples in the window before `today`
    pub fn baselines(&self, history: &[BiometricSample], today: NaiveDate) -> Baselines {
        let window_start = today
            .checked_sub_days(Days::new(u64::from(self.config.baseline_window_days)))
            .unwrap_or(NaiveDate::MIN);

        let window: Vec<&BiometricSample> = history
            .iter()
            .filter(|s| s.date >= window_start && s.date < today)
            .collect();

        let (hrv, hrv_source) = self.baseline_of(
            window.iter().filter_map(|s| positive(s.hrv)),
            self.config.population_hrv_ms,
        );
        let (resting_hr, resting_hr_source) = self.baseline_of(
            window.iter().filter_map(|s| positive(s.resting_hr)),
            self.config.population_resting_hr,
        );
        let (rmssd, rmssd_source) = self.baseline_of(
            window.iter().filter_map(|s| positive(s.rmssd)),
            self.config.population_rmssd_ms,
        );

        Baselines {
            hrv,
            hrv_source,
            resting_hr,
            resting_hr_source,
            rmssd,
            rmssd_source,
        }
    }

    fn baseline_of(
        &self,
        readings: impl Iterator<Item = f64>,
        population: f64,
    ) -> (f64, BaselineSource) {
        let readings: Vec<f64> = readings.collect();
        if readings.len() < self.config.min_baseline_samples || readings.is_empty() {
            return (population, BaselineSource::Population);
        }
        (readings.iter().mean(), BaselineSource::History)
    }

    fn sub_scores(&self, today: &BiometricSample, baselines: &Baselines) -> SubScores {
        let cfg = &self.config;

        let hrv = positive(today.hrv)
            .map(|hrv| centred(hrv - baselines.hrv, cfg.hrv_sensitivity_ms));
        let resting_hr = positive(today.resting_hr)
            .map(|rhr| centred(baselines.resting_hr - rhr, cfg.resting_hr_sensitivity));
        let rmssd = positive(today.rmssd)
            .map(|rmssd| centred(rmssd - baselines.rmssd, cfg.rmssd_sensitivity_ms));

        let sleep = today
            .sleep_duration_hours
            .filter(|h| h.is_finite() && *h >= 0.0)
            .map(|h| {
                if cfg.target_sleep_hours > 0.0 {
                    (h / cfg.target_sleep_hours).clamp(0.0, 1.0)
                } else {
                    1.0
                }
            });

        let subjective = today
            .subjective_readiness
            .filter(|r| (1..=10).contains(r))
            .map(|r| f64::from(r - 1) / 9.0);

        SubScores {
            hrv,
            resting_hr,
            sleep,
            rmssd,
            subjective,
        }
    }

    /// Weighted mean of the present sub-scores, scaled to 100
    fn composite(&self, subs: &SubScores) -> f64 {
        let w = &self.config.weights;
        let weighted = [
            (subs.hrv, w.hrv),
            (subs.resting_hr, w.resting_hr),
            (subs.sleep, w.sleep),
            (subs.rmssd, w.rmssd),
            (subs.subjective, w.subjective),
        ];

        let (sum, total_weight) = weighted
            .iter()
            .filter_map(|(score, weight)| score.map(|s| (s, weight.max(0.0))))
            .fold((0.0, 0.0), |(sum, total), (s, weight)| {
                (sum + s * weight, total + weight)
            });

        if total_weight <= 0.0 {
            return 50.0;
        }

        sum / total_weight * 100.0
    }
}

/// Keep only physiologically meaningful readings; a provider reporting 0
/// means "not measured"
fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Map a signed deviation onto `[0, 1]` with 0.5 at no deviation
fn centred(deviation: f64, sensitivity: f64) -> f64 {
    if sensitivity <= 0.0 {
        return if deviation >= 0.0 { 1.0 } else { 0.0 };
    }
    (0.5 + deviation / (2.0 * sensitivity)).clamp(0.0, 1.0)
}
