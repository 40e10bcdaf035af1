//! One day's evaluation
//!
//! The single control point that runs load → readiness → mission against a
//! consistent store snapshot and writes the derived readiness score back.
//! The computed result is returned even when that write fails.

use crate::config::AppConfig;
use crate::error::PersistenceFault;
use crate::load::{LoadCalculator, LoadProfile};
use crate::mission::{MissionPlanner, PrescribedMission};
use crate::models::{BiometricSample, ScheduledDirective};
use crate::readiness::{ReadinessBreakdown, ReadinessCalculator, ReadinessInputs};
use crate::store::SnapshotStore;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

/// Everything computed for one day
#[derive(Debug, Clone, Serialize)]
pub struct DailyEvaluation {
    pub date: NaiveDate,

    /// The sample that was scored: the input merged over any sample already
    /// stored for the day, the same record `evaluate` writes back
    pub sample: BiometricSample,

    pub load: LoadProfile,
    pub readiness: ReadinessBreakdown,
    pub directive: Option<ScheduledDirective>,
    pub mission: PrescribedMission,

    /// Set when the readiness score could not be stored
    #[serde(skip)]
    pub persistence_error: Option<PersistenceFault>,
}

impl DailyEvaluation {
    pub fn score(&self) -> u8 {
        self.readiness.score
    }

    pub fn is_saved(&self) -> bool {
        self.persistence_error.is_none()
    }
}

/// Load, readiness and mission engines wired together
#[derive(Debug, Clone, Default)]
pub struct DailyEngine {
    load: LoadCalculator,
    readiness: ReadinessCalculator,
    mission: MissionPlanner,
}

impl DailyEngine {
    pub fn new(load: LoadCalculator, readiness: ReadinessCalculator, mission: MissionPlanner) -> Self {
        DailyEngine {
            load,
            readiness,
            mission,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        DailyEngine {
            load: LoadCalculator::with_config(config.load.clone()),
            readiness: ReadinessCalculator::with_config(config.readiness.clone()),
            mission: MissionPlanner::with_config(config.mission.clone()),
        }
    }

    /// Compute today's result without touching the store
    ///
    /// Fields missing from `today` are taken from the sample already stored
    /// for that date, matching what a save would merge.
    pub fn compute<S: SnapshotStore + ?Sized>(
        &self,
        store: &S,
        today: &BiometricSample,
        yesterday_net_energy: Option<f64>,
    ) -> DailyEvaluation {
        let date = today.date;

        // One snapshot for the whole evaluation
        let sessions = store.sessions();
        let history = store.samples();
        let directive = store.directive_for(date);

        let mut sample = today.clone();
        if let Some(stored) = history.iter().find(|s| s.date == date) {
            sample.merge_missing(stored);
        }

        let load = self.load.calculate_profile(&sessions, date);
        let readiness = self.readiness.calculate(&ReadinessInputs {
            today: &sample,
            history: &history,
            load: &load,
            yesterday_net_energy,
        });
        let mission = self.mission.prescribe(directive.as_ref(), readiness.score);

        sample.readiness_score = Some(readiness.score);

        DailyEvaluation {
            date,
            sample,
            load,
            readiness,
            directive,
            mission,
            persistence_error: None,
        }
    }

    /// Compute today's result and store the readiness score on today's sample
    pub fn evaluate<S: SnapshotStore + ?Sized>(
        &self,
        store: &mut S,
        today: BiometricSample,
        yesterday_net_energy: Option<f64>,
    ) -> DailyEvaluation {
        let mut evaluation = self.compute(store, &today, yesterday_net_energy);

        if let Err(fault) = store.save_sample(evaluation.sample.clone()) {
            warn!(date = %evaluation.date, %fault, "readiness computed but not saved");
            evaluation.persistence_error = Some(fault);
        }

        info!(
            date = %evaluation.date,
            score = evaluation.readiness.score,
            category = %evaluation.readiness.category,
            strain = %evaluation.load.strain_flag,
            altered = evaluation.mission.is_altered,
            saved = evaluation.is_saved(),
            "daily evaluation complete"
        );

        evaluation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FuelTier, SessionRecord};
    use crate::store::{InMemoryStore, Snapshot};
    use chrono::Days;
    use uuid::Uuid;

    struct FailingStore {
        inner: InMemoryStore,
    }

    impl SnapshotStore for FailingStore {
        fn samples(&self) -> Vec<BiometricSample> {
            self.inner.samples()
        }

        fn sessions(&self) -> Vec<SessionRecord> {
            self.inner.sessions()
        }

        fn directive_for(&self, date: NaiveDate) -> Option<ScheduledDirective> {
            self.inner.directive_for(date)
        }

        fn directive_by_id(&self, id: Uuid) -> Option<ScheduledDirective> {
            self.inner.directive_by_id(id)
        }

        fn save_sample(&mut self, _sample: BiometricSample) -> Result<(), PersistenceFault> {
            Err(PersistenceFault::WriteFailed {
                operation: "biometric sample".to_string(),
                reason: "read-only volume".to_string(),
            })
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 20).unwrap()
    }

    fn store_with_history() -> InMemoryStore {
        let mut snapshot = Snapshot::default();
        for n in 1..=14 {
            let mut sample = BiometricSample::empty(today() - Days::new(n));
            sample.hrv = Some(60.0);
            sample.resting_hr = Some(50.0);
            sample.sleep_duration_hours = Some(8.0);
            snapshot.upsert_sample(sample);
        }
        snapshot.add_directives([ScheduledDirective {
            id: Uuid::new_v4(),
            date: today(),
            activity_description: "VO2 5x4min".to_string(),
            power_target: "300W".to_string(),
            fuel_tier: FuelTier::High,
            coach_notes: String::new(),
        }]);
        InMemoryStore::from_snapshot(snapshot)
    }

    fn rough_morning() -> BiometricSample {
        let mut sample = BiometricSample::empty(today());
        sample.hrv = Some(35.0);
        sample.resting_hr = Some(62.0);
        sample.sleep_duration_hours = Some(4.0);
        sample
    }

    #[test]
    fn test_evaluate_saves_score() {
        let mut store = store_with_history();
        let engine = DailyEngine::default();

        let evaluation = engine.evaluate(&mut store, rough_morning(), None);
        assert!(evaluation.is_saved());
        assert!(evaluation.mission.is_altered);

        let saved = store.snapshot().samples.get(&today()).unwrap();
        assert_eq!(saved.readiness_score, Some(evaluation.score()));
    }

    #[test]
    fn test_failed_save_still_returns_result() {
        let mut store = FailingStore {
            inner: store_with_history(),
        };
        let engine = DailyEngine::default();

        let evaluation = engine.evaluate(&mut store, rough_morning(), None);
        assert!(!evaluation.is_saved());
        assert!(matches!(
            evaluation.persistence_error,
            Some(PersistenceFault::WriteFailed { .. })
        ));
        assert!(evaluation.readiness.score < 40);
        assert!(evaluation.mission.is_altered);
    }

    #[test]
    fn test_empty_store_gives_neutral_rest_day() {
        let mut store = InMemoryStore::new();
        let engine = DailyEngine::default();

        let evaluation = engine.evaluate(&mut store, BiometricSample::empty(today()), None);
        assert_eq!(evaluation.score(), 50);
        assert_eq!(evaluation.load, LoadProfile::neutral());
        assert!(evaluation.directive.is_none());
        assert_eq!(evaluation.mission.title, "Active Recovery");
    }

    /// A manual entry on a day the provider already filled is scored together
    /// with the stored readings, and the saved score matches the saved record
    #[test]
    fn test_manual_entry_scored_with_stored_readings() {
        let mut store = store_with_history();
        store.snapshot_mut().upsert_sample(BiometricSample {
            hrv: Some(30.0),
            resting_hr: Some(70.0),
            sleep_duration_hours: Some(4.0),
            ..BiometricSample::empty(today())
        });
        let engine = DailyEngine::default();

        let mut manual = BiometricSample::empty(today());
        manual.subjective_readiness = Some(9);

        let evaluation = engine.evaluate(&mut store, manual, None);
        assert_eq!(evaluation.sample.hrv, Some(30.0));
        assert_eq!(evaluation.sample.subjective_readiness, Some(9));
        assert!(evaluation.score() < 40);
        assert!(evaluation.mission.is_altered);

        let saved = store.snapshot().samples.get(&today()).unwrap().clone();
        assert_eq!(saved, evaluation.sample);
        assert_eq!(saved.readiness_score, Some(evaluation.score()));

        let rescored = engine.compute(&store, &saved, None);
        assert_eq!(rescored.score(), evaluation.score());
    }

    #[test]
    fn test_compute_is_pure() {
        let store = store_with_history();
        let engine = DailyEngine::default();
        let sample = rough_morning();

        let first = engine.compute(&store, &sample, Some(-800.0));
        let second = engine.compute(&store, &sample, Some(-800.0));
        assert_eq!(first.readiness, second.readiness);
        assert_eq!(first.mission, second.mission);
        assert!(store.snapshot().samples.get(&today()).is_none());
    }
}
