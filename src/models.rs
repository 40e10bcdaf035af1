use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Training disciplines tracked by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Discipline {
    Run,
    Row,
    Spin,
    Strength,
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discipline::Run => write!(f, "RUN"),
            Discipline::Row => write!(f, "ROW"),
            Discipline::Spin => write!(f, "SPIN"),
            Discipline::Strength => write!(f, "STRENGTH"),
        }
    }
}

/// One day's biometric readings
///
/// Every measured field is optional: a day can be partially filled from the
/// provider and completed by manual entry later. At most one sample exists per
/// calendar day; `date` is the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricSample {
    /// Calendar day of the readings
    pub date: NaiveDate,

    /// Overnight heart rate variability in milliseconds
    pub hrv: Option<f64>,

    /// Resting heart rate in beats per minute
    pub resting_hr: Option<f64>,

    /// Total sleep in hours
    pub sleep_duration_hours: Option<f64>,

    /// Body weight in kilograms
    pub weight_kg: Option<f64>,

    /// Morning RMSSD from a dedicated chest-strap protocol, in milliseconds
    #[serde(default)]
    pub rmssd: Option<f64>,

    /// Self-reported readiness on a 1-10 scale
    #[serde(default)]
    pub subjective_readiness: Option<u8>,

    /// Readiness score written back after evaluation
    #[serde(default)]
    pub readiness_score: Option<u8>,
}

impl BiometricSample {
    /// An empty sample for the given day
    pub fn empty(date: NaiveDate) -> Self {
        BiometricSample {
            date,
            hrv: None,
            resting_hr: None,
            sleep_duration_hours: None,
            weight_kg: None,
            rmssd: None,
            subjective_readiness: None,
            readiness_score: None,
        }
    }

    /// Fill the fields of `self` that are absent with the values from `other`
    ///
    /// Used when a manual entry and a provider fetch land on the same day.
    pub fn merge_missing(&mut self, other: &BiometricSample) {
        self.hrv = self.hrv.or(other.hrv);
        self.resting_hr = self.resting_hr.or(other.resting_hr);
        self.sleep_duration_hours = self.sleep_duration_hours.or(other.sleep_duration_hours);
        self.weight_kg = self.weight_kg.or(other.weight_kg);
        self.rmssd = self.rmssd.or(other.rmssd);
        self.subjective_readiness = self.subjective_readiness.or(other.subjective_readiness);
        self.readiness_score = self.readiness_score.or(other.readiness_score);
    }
}

/// A completed training session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique identifier for the session
    pub id: Uuid,

    /// Day the session was performed
    pub date: NaiveDate,

    /// Discipline trained
    pub discipline: Discipline,

    /// Moving time in minutes
    pub duration_minutes: Decimal,

    /// Distance in kilometres
    pub distance_km: Decimal,

    /// Average heart rate in beats per minute
    pub average_hr: u16,

    /// Rate of perceived exertion, 1-10
    pub rpe: u8,

    /// Average power in watts
    #[serde(default)]
    pub avg_power: Option<u16>,

    /// Average cadence (spm for running, rpm for spin, strokes/min for row)
    #[serde(default)]
    pub avg_cadence: Option<u16>,

    /// Ground contact time in milliseconds (running dynamics)
    #[serde(default)]
    pub ground_contact_time_ms: Option<u16>,

    /// Vertical oscillation in centimetres (running dynamics)
    #[serde(default)]
    pub vertical_oscillation_cm: Option<Decimal>,

    /// Total elevation gain in metres
    #[serde(default)]
    pub elevation_gain_m: Option<u16>,

    /// Identifier of the directive this session fulfilled, if any
    ///
    /// Resolved by lookup; the directive may since have been deleted.
    #[serde(default)]
    pub linked_directive_id: Option<Uuid>,
}

/// Carbohydrate/fuel prescription attached to a directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelTier {
    Low,
    Moderate,
    High,
}

impl FuelTier {
    /// The next lighter tier; `Low` stays `Low`
    pub fn step_down(self) -> Self {
        match self {
            FuelTier::High => FuelTier::Moderate,
            FuelTier::Moderate | FuelTier::Low => FuelTier::Low,
        }
    }
}

impl fmt::Display for FuelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuelTier::Low => write!(f, "Low"),
            FuelTier::Moderate => write!(f, "Moderate"),
            FuelTier::High => write!(f, "High"),
        }
    }
}

impl FromStr for FuelTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "light" => Ok(FuelTier::Low),
            "moderate" | "medium" | "mid" => Ok(FuelTier::Moderate),
            "high" | "heavy" => Ok(FuelTier::High),
            other => Err(format!("unknown fuel tier '{}'", other)),
        }
    }
}

/// A scheduled training prescription for one day, authored outside the app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledDirective {
    /// Identifier used by sessions to link back to this directive
    pub id: Uuid,

    /// Day the directive applies to
    pub date: NaiveDate,

    /// What to do, e.g. "Threshold intervals 4x8min"
    pub activity_description: String,

    /// Intensity target as written by the coach ("230W", "88% FTP", "Z2")
    pub power_target: String,

    /// Fuelling tier for the day
    pub fuel_tier: FuelTier,

    /// Free-form notes from the coach
    pub coach_notes: String,
}

/// Athlete-configured heart rate zone boundaries and baselines
///
/// Zone 5 is unbounded above `zone4_max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneThresholds {
    pub zone1_max: u16, // Recovery
    pub zone2_max: u16, // Aerobic
    pub zone3_max: u16, // Tempo
    pub zone4_max: u16, // Threshold
    /// Functional threshold power in watts
    pub functional_threshold_power: u16,
    /// Target body weight in kilograms
    pub target_weight: Decimal,
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        ZoneThresholds {
            zone1_max: 120,
            zone2_max: 140,
            zone3_max: 155,
            zone4_max: 170,
            functional_threshold_power: 250,
            target_weight: Decimal::from(75),
        }
    }
}

/// One telemetry reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        TimeSeriesPoint { timestamp, value }
    }
}

/// Time-series metrics the telemetry provider can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    HeartRate,
    Power,
    Cadence,
    GroundContactTime,
    VerticalOscillation,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::HeartRate => write!(f, "heart_rate"),
            Metric::Power => write!(f, "power"),
            Metric::Cadence => write!(f, "cadence"),
            Metric::GroundContactTime => write!(f, "ground_contact_time"),
            Metric::VerticalOscillation => write!(f, "vertical_oscillation"),
        }
    }
}

/// Summary of the most recent workout as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub start: DateTime<Utc>,
    pub duration_minutes: u32,
    pub discipline: Discipline,
    pub distance_km: Option<Decimal>,
    pub avg_heart_rate: Option<u16>,
    pub avg_power: Option<u16>,
    pub active_energy_kcal: Option<u32>,
}

/// Macronutrient totals for today, in grams
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyMacros {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// Today's energy intake against expenditure, in kcal
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyBalance {
    pub intake: f64,
    pub burned: f64,
    pub net: f64,
}

/// Net energy balance for a past day, in kcal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyEnergy {
    pub date: NaiveDate,
    pub net: f64,
}
