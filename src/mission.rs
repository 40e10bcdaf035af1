//! Readiness-adapted training prescription
//!
//! Takes today's scheduled directive (if any) and today's readiness score and
//! decides what the athlete is actually told to do. Deterministic: the same
//! pair always yields the same mission.

use crate::models::{FuelTier, ScheduledDirective};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// The prescription shown to the athlete for today
///
/// Recomputed on every evaluation, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescribedMission {
    pub title: String,
    pub power_target: String,
    pub fuel_tier: FuelTier,
    pub coach_notes: String,
    /// True when the scheduled directive was downgraded
    pub is_altered: bool,
}

/// Readiness band the mission rules branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessBand {
    /// Below the downgrade threshold
    Compromised,
    /// Between the downgrade and the caution thresholds
    Caution,
    Green,
}

impl fmt::Display for ReadinessBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessBand::Compromised => write!(f, "compromised"),
            ReadinessBand::Caution => write!(f, "caution"),
            ReadinessBand::Green => write!(f, "green"),
        }
    }
}

/// Mission rule configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Scores below this downgrade the directive (default: 40)
    pub downgrade_below: u8,

    /// Scores below this, and at or above `downgrade_below`, add a caution note (default: 65)
    pub caution_below: u8,

    /// Fraction of the prescribed intensity kept when downgrading
    pub downgrade_intensity_pct: u32,

    /// Rest mission used on days without a directive
    pub rest_title: String,
    pub rest_power_target: String,
    pub rest_fuel_tier: FuelTier,
    pub rest_notes: String,
}

impl Default for MissionConfig {
    fn default() -> Self {
        MissionConfig {
            downgrade_below: 40,
            caution_below: 65,
            downgrade_intensity_pct: 70,
            rest_title: "Active Recovery".to_string(),
            rest_power_target: "Zone 1 (<55% FTP)".to_string(),
            rest_fuel_tier: FuelTier::Low,
            rest_notes: "No session scheduled. Easy movement or full rest.".to_string(),
        }
    }
}

/// Mission rule engine
#[derive(Debug, Clone, Default)]
pub struct MissionPlanner {
    config: MissionConfig,
}

impl MissionPlanner {
    pub fn new() -> Self {
        MissionPlanner {
            config: MissionConfig::default(),
        }
    }

    pub fn with_config(config: MissionConfig) -> Self {
        MissionPlanner { config }
    }

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    /// Band a readiness score falls into
    pub fn band(&self, readiness: u8) -> ReadinessBand {
        if readiness < self.config.downgrade_below {
            ReadinessBand::Compromised
        } else if readiness < self.config.caution_below {
            ReadinessBand::Caution
        } else {
            ReadinessBand::Green
        }
    }

    /// Produce today's mission
    pub fn prescribe(&self, directive: Option<&ScheduledDirective>, readiness: u8) -> PrescribedMission {
        let Some(directive) = directive else {
            debug!(readiness, "no directive scheduled, prescribing rest");
            return self.rest_mission();
        };

        let band = self.band(readiness);
        debug!(
            directive = %directive.id,
            readiness,
            %band,
            "prescribing mission"
        );

        match band {
            ReadinessBand::Compromised => PrescribedMission {
                title: format!("{} (Reduced)", directive.activity_description),
                power_target: self.reduce_target(&directive.power_target),
                fuel_tier: directive.fuel_tier.step_down(),
                coach_notes: append_note(
                    &directive.coach_notes,
                    &format!(
                        "Readiness {}/100: intensity reduced to {}% to protect recovery.",
                        readiness, self.config.downgrade_intensity_pct
                    ),
                ),
                is_altered: true,
            },
            ReadinessBand::Caution => PrescribedMission {
                coach_notes: append_note(
                    &directive.coach_notes,
                    &format!(
                        "Readiness {}/100: proceed with caution and cut the session short if heart rate drifts.",
                        readiness
                    ),
                ),
                ..Self::as_scheduled(directive)
            },
            ReadinessBand::Green => Self::as_scheduled(directive),
        }
    }

    fn rest_mission(&self) -> PrescribedMission {
        PrescribedMission {
            title: self.config.rest_title.clone(),
            power_target: self.config.rest_power_target.clone(),
            fuel_tier: self.config.rest_fuel_tier,
            coach_notes: self.config.rest_notes.clone(),
            is_altered: false,
        }
    }

    fn as_scheduled(directive: &ScheduledDirective) -> PrescribedMission {
        PrescribedMission {
            title: directive.activity_description.clone(),
            power_target: directive.power_target.clone(),
            fuel_tier: directive.fuel_tier,
            coach_notes: directive.coach_notes.clone(),
            is_altered: false,
        }
    }

    /// Scale a written intensity target down
    ///
    /// Handles plain watts ("230", "230.5W", "230 w") and FTP percentages
    /// ("88%", "88.5% FTP"), rounded to whole numbers. Anything else (zones,
    /// descriptive targets) becomes an easy aerobic target.
    pub fn reduce_target(&self, target: &str) -> String {
        let pct = Decimal::from(self.config.downgrade_intensity_pct);
        let trimmed = target.trim();

        let number: String = trimmed
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let rest = trimmed[number.len()..].trim();

        if let Ok(value) = number.parse::<Decimal>() {
            let reduced = (value * pct / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .normalize();
            let rest_lower = rest.to_lowercase();
            if rest.is_empty() || rest_lower == "w" || rest_lower == "watts" {
                return format!("{}W", reduced);
            }
            if let Some(suffix) = rest.strip_prefix('%') {
                return format!("{}%{}", reduced, suffix);
            }
        }

        "Zone 1-2 (conversational)".to_string()
    }
}

fn append_note(notes: &str, addition: &str) -> String {
    if notes.trim().is_empty() {
        addition.to_string()
    } else {
        format!("{}\n{}", notes.trim_end(), addition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn directive() -> ScheduledDirective {
        ScheduledDirective {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            activity_description: "Threshold 3x12min".to_string(),
            power_target: "240W".to_string(),
            fuel_tier: FuelTier::High,
            coach_notes: "Hold cadence above 85.".to_string(),
        }
    }

    #[test]
    fn test_no_directive_prescribes_rest() {
        let planner = MissionPlanner::new();
        let mission = planner.prescribe(None, 70);
        assert_eq!(mission.title, "Active Recovery");
        assert_eq!(mission.fuel_tier, FuelTier::Low);
        assert!(!mission.is_altered);

        // Readiness does not matter without a directive
        assert_eq!(planner.prescribe(None, 5), mission);
    }

    #[test]
    fn test_high_readiness_passes_through() {
        let planner = MissionPlanner::new();
        let directive = directive();
        let mission = planner.prescribe(Some(&directive), 85);

        assert!(!mission.is_altered);
        assert_eq!(mission.title, directive.activity_description);
        assert_eq!(mission.power_target, directive.power_target);
        assert_eq!(mission.fuel_tier, directive.fuel_tier);
        assert_eq!(mission.coach_notes, directive.coach_notes);
    }

    #[test]
    fn test_moderate_readiness_adds_caution() {
        let planner = MissionPlanner::new();
        let directive = directive();
        let mission = planner.prescribe(Some(&directive), 50);

        assert!(!mission.is_altered);
        assert_eq!(mission.power_target, "240W");
        assert!(mission.coach_notes.starts_with("Hold cadence above 85."));
        assert!(mission.coach_notes.contains("caution"));
    }

    #[test]
    fn test_low_readiness_downgrades() {
        let planner = MissionPlanner::new();
        let directive = directive();
        let mission = planner.prescribe(Some(&directive), 20);

        assert!(mission.is_altered);
        assert_eq!(mission.power_target, "168W");
        assert_eq!(mission.fuel_tier, FuelTier::Moderate);
        assert!(mission.title.contains("Reduced"));
        assert!(mission.coach_notes.contains("Readiness 20/100"));
        assert!(mission.coach_notes.starts_with("Hold cadence above 85."));
    }

    #[test]
    fn test_band_boundaries() {
        let planner = MissionPlanner::new();
        assert_eq!(planner.band(39), ReadinessBand::Compromised);
        assert_eq!(planner.band(40), ReadinessBand::Caution);
        assert_eq!(planner.band(64), ReadinessBand::Caution);
        assert_eq!(planner.band(65), ReadinessBand::Green);
    }

    #[test]
    fn test_prescription_is_deterministic() {
        let planner = MissionPlanner::new();
        let directive = directive();
        for readiness in [0, 39, 40, 64, 65, 100] {
            assert_eq!(
                planner.prescribe(Some(&directive), readiness),
                planner.prescribe(Some(&directive), readiness)
            );
        }
    }

    #[test]
    fn test_reduce_target_formats() {
        let planner = MissionPlanner::new();
        assert_eq!(planner.reduce_target("200"), "140W");
        assert_eq!(planner.reduce_target("250 watts"), "175W");
        assert_eq!(planner.reduce_target("90% FTP"), "63% FTP");
        assert_eq!(planner.reduce_target("230.5W"), "161W");
        assert_eq!(planner.reduce_target("88.5% FTP"), "62% FTP");
        assert_eq!(planner.reduce_target("305"), "214W");
        assert_eq!(planner.reduce_target("Z3 tempo"), "Zone 1-2 (conversational)");
        assert_eq!(planner.reduce_target(""), "Zone 1-2 (conversational)");
    }

    #[test]
    fn test_downgrade_with_empty_notes() {
        let planner = MissionPlanner::new();
        let mut directive = directive();
        directive.coach_notes = String::new();
        let mission = planner.prescribe(Some(&directive), 10);
        assert!(mission.coach_notes.starts_with("Readiness 10/100"));
    }
}
