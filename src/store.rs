//! Persistent store seam
//!
//! The engines never see a schema: the store hands them in-memory snapshots of
//! samples and sessions and accepts the derived readiness score back. Two
//! implementations ship with the crate: a plain in-memory store and a JSON
//! file store for the CLI.

use crate::error::PersistenceFault;
use crate::models::{BiometricSample, ScheduledDirective, SessionRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Store operations the core relies on
pub trait SnapshotStore {
    /// All biometric samples, oldest first, at most one per day
    fn samples(&self) -> Vec<BiometricSample>;

    /// All sessions, oldest first
    fn sessions(&self) -> Vec<SessionRecord>;

    /// The directive scheduled for `date`, if any
    fn directive_for(&self, date: NaiveDate) -> Option<ScheduledDirective>;

    /// Resolve a directive identifier; `None` when it no longer exists
    fn directive_by_id(&self, id: Uuid) -> Option<ScheduledDirective>;

    /// Insert or update the sample for `sample.date`
    fn save_sample(&mut self, sample: BiometricSample) -> Result<(), PersistenceFault>;
}

/// Store contents; also the on-disk format of [`JsonFileStore`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub samples: BTreeMap<NaiveDate, BiometricSample>,
    pub sessions: Vec<SessionRecord>,
    pub directives: BTreeMap<Uuid, ScheduledDirective>,
}

impl Snapshot {
    /// Insert a sample, merging into any existing sample for the same day
    ///
    /// Fields present in `sample` win; fields it lacks keep their stored value.
    pub fn upsert_sample(&mut self, mut sample: BiometricSample) {
        if let Some(existing) = self.samples.get(&sample.date) {
            sample.merge_missing(existing);
        }
        self.samples.insert(sample.date, sample);
    }

    pub fn add_session(&mut self, session: SessionRecord) {
        let position = self.sessions.partition_point(|s| s.date <= session.date);
        self.sessions.insert(position, session);
    }

    /// Schedule directives; a directive replaces any other on the same day
    pub fn add_directives(&mut self, directives: impl IntoIterator<Item = ScheduledDirective>) {
        for directive in directives {
            self.directives.retain(|_, d| d.date != directive.date);
            self.directives.insert(directive.id, directive);
        }
    }

    /// Remove a directive; sessions linking to it keep their (now dangling) link
    pub fn remove_directive(&mut self, id: Uuid) -> Option<ScheduledDirective> {
        self.directives.remove(&id)
    }

    fn directive_for(&self, date: NaiveDate) -> Option<ScheduledDirective> {
        self.directives.values().find(|d| d.date == date).cloned()
    }
}

/// Store held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    snapshot: Snapshot,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        InMemoryStore { snapshot }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn snapshot_mut(&mut self) -> &mut Snapshot {
        &mut self.snapshot
    }
}

impl SnapshotStore for InMemoryStore {
    fn samples(&self) -> Vec<BiometricSample> {
        self.snapshot.samples.values().cloned().collect()
    }

    fn sessions(&self) -> Vec<SessionRecord> {
        self.snapshot.sessions.clone()
    }

    fn directive_for(&self, date: NaiveDate) -> Option<ScheduledDirective> {
        self.snapshot.directive_for(date)
    }

    fn directive_by_id(&self, id: Uuid) -> Option<ScheduledDirective> {
        self.snapshot.directives.get(&id).cloned()
    }

    fn save_sample(&mut self, sample: BiometricSample) -> Result<(), PersistenceFault> {
        self.snapshot.upsert_sample(sample);
        Ok(())
    }
}

/// Store persisted as a single pretty-printed JSON document
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    snapshot: Snapshot,
}

impl JsonFileStore {
    /// Open the store at `path`; a missing file opens an empty store
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceFault> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            debug!(path = %path.display(), "store file missing, starting empty");
            return Ok(JsonFileStore {
                path,
                snapshot: Snapshot::default(),
            });
        }

        let content = fs::read_to_string(&path).map_err(|e| PersistenceFault::ReadFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|e| PersistenceFault::Corrupted {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        info!(
            path = %path.display(),
            samples = snapshot.samples.len(),
            sessions = snapshot.sessions.len(),
            directives = snapshot.directives.len(),
            "store opened"
        );

        Ok(JsonFileStore { path, snapshot })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Apply `change` to the snapshot and write it out
    pub fn update<F>(&mut self, operation: &str, change: F) -> Result<(), PersistenceFault>
    where
        F: FnOnce(&mut Snapshot),
    {
        let mut next = self.snapshot.clone();
        change(&mut next);
        self.write(operation, &next)?;
        self.snapshot = next;
        Ok(())
    }

    /// Write to a sibling temp file, then rename over the store
    fn write(&self, operation: &str, snapshot: &Snapshot) -> Result<(), PersistenceFault> {
        let fail = |reason: String| PersistenceFault::WriteFailed {
            operation: operation.to_string(),
            reason,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(snapshot).map_err(|e| fail(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| fail(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| fail(e.to_string()))?;

        debug!(path = %self.path.display(), operation, "store written");
        Ok(())
    }
}

impl SnapshotStore for JsonFileStore {
    fn samples(&self) -> Vec<BiometricSample> {
        self.snapshot.samples.values().cloned().collect()
    }

    fn sessions(&self) -> Vec<SessionRecord> {
        self.snapshot.sessions.clone()
    }

    fn directive_for(&self, date: NaiveDate) -> Option<ScheduledDirective> {
        self.snapshot.directive_for(date)
    }

    fn directive_by_id(&self, id: Uuid) -> Option<ScheduledDirective> {
        self.snapshot.directives.get(&id).cloned()
    }

    fn save_sample(&mut self, sample: BiometricSample) -> Result<(), PersistenceFault> {
        self.update("biometric sample", |snapshot| snapshot.upsert_sample(sample))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Discipline, FuelTier};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, day).unwrap()
    }

    fn directive(day: u32) -> ScheduledDirective {
        ScheduledDirective {
            id: Uuid::new_v4(),
            date: date(day),
            activity_description: "Tempo run".to_string(),
            power_target: "85% FTP".to_string(),
            fuel_tier: FuelTier::Moderate,
            coach_notes: String::new(),
        }
    }

    fn session(day: u32, link: Option<Uuid>) -> SessionRecord {
        SessionRecord {
            id: Uuid::new_v4(),
            date: date(day),
            discipline: Discipline::Run,
            duration_minutes: dec!(50),
            distance_km: dec!(10.2),
            average_hr: 150,
            rpe: 6,
            avg_power: Some(260),
            avg_cadence: Some(176),
            ground_contact_time_ms: Some(245),
            vertical_oscillation_cm: Some(dec!(8.4)),
            elevation_gain_m: Some(40),
            linked_directive_id: link,
        }
    }

    #[test]
    fn test_one_sample_per_day() {
        let mut store = InMemoryStore::new();
        let mut morning = BiometricSample::empty(date(3));
        morning.hrv = Some(62.0);
        store.save_sample(morning).unwrap();

        let mut evening = BiometricSample::empty(date(3));
        evening.weight_kg = Some(71.5);
        evening.readiness_score = Some(70);
        store.save_sample(evening).unwrap();

        let samples = store.samples();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].hrv, Some(62.0));
        assert_eq!(samples[0].weight_kg, Some(71.5));
        assert_eq!(samples[0].readiness_score, Some(70));
    }

    #[test]
    fn test_sessions_kept_in_date_order() {
        let mut snapshot = Snapshot::default();
        snapshot.add_session(session(5, None));
        snapshot.add_session(session(2, None));
        snapshot.add_session(session(9, None));
        let dates: Vec<_> = snapshot.sessions.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![date(2), date(5), date(9)]);
    }

    #[test]
    fn test_deleted_directive_leaves_session_dangling() {
        let directive = directive(4);
        let mut snapshot = Snapshot::default();
        snapshot.add_directives([directive.clone()]);
        snapshot.add_session(session(4, Some(directive.id)));
        let mut store = InMemoryStore::from_snapshot(snapshot);

        let link = store.sessions()[0].linked_directive_id.unwrap();
        assert!(store.directive_by_id(link).is_some());

        store.snapshot_mut().remove_directive(directive.id);
        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.sessions()[0].linked_directive_id, Some(link));
        assert!(store.directive_by_id(link).is_none());
        assert!(store.directive_for(date(4)).is_none());
    }

    #[test]
    fn test_directive_replaces_same_day() {
        let mut snapshot = Snapshot::default();
        let first = directive(6);
        let second = directive(6);
        snapshot.add_directives([first.clone(), directive(8)]);
        snapshot.add_directives([second.clone()]);

        assert_eq!(snapshot.directives.len(), 2);
        assert_eq!(snapshot.directive_for(date(6)), Some(second));
        assert!(!snapshot.directives.contains_key(&first.id));
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("store.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        assert!(store.samples().is_empty());

        let directive = directive(7);
        store
            .update("directives", |s| s.add_directives([directive.clone()]))
            .unwrap();
        let mut sample = BiometricSample::empty(date(7));
        sample.sleep_duration_hours = Some(7.5);
        store.save_sample(sample).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.samples().len(), 1);
        assert_eq!(reopened.directive_for(date(7)), Some(directive));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupted_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::open(&path).unwrap_err();
        assert!(matches!(err, PersistenceFault::Corrupted { .. }));
    }
}
