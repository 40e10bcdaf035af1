//! Bulk directive ingestion
//!
//! Coaches author training plans outside the app and hand them over as a JSON
//! array or a CSV file with one directive per record:
//!
//! ```text
//! date,activity,powerTarget,fuelTier,coachNotes
//! 2024-06-03,Threshold 3x12min,95% FTP,high,Hold cadence above 85
//! ```
//!
//! Policy is skip-and-report: every well-formed record is accepted, every
//! malformed record produces a [`ValidationFault`] naming its position and the
//! offending field. A batch that cannot be read at all (not JSON, not an array,
//! unreadable CSV) is an error for the whole call.

use crate::error::{ReadyError, Result, ValidationFault};
use crate::models::{FuelTier, ScheduledDirective};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of one ingestion batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Directives that passed validation, in batch order
    pub accepted: Vec<ScheduledDirective>,

    /// One fault per rejected record, in batch order
    pub faults: Vec<ValidationFault>,
}

impl IngestReport {
    pub fn success_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn failure_count(&self) -> usize {
        self.faults.len()
    }

    pub fn total(&self) -> usize {
        self.accepted.len() + self.faults.len()
    }

    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// One record before validation, fields as written in the batch
#[derive(Debug, Clone, Default)]
struct RawDirective {
    date: Option<String>,
    activity: Option<String>,
    power_target: Option<String>,
    fuel_tier: Option<String>,
    coach_notes: Option<String>,
}

/// Batch importer for scheduled directives
pub struct DirectiveIngestor {
    column_mapping: HashMap<String, &'static str>,
}

impl Default for DirectiveIngestor {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectiveIngestor {
    pub fn new() -> Self {
        let mut column_mapping = HashMap::new();

        Self::add_mapping(&mut column_mapping, "date", &["date", "day"]);
        Self::add_mapping(
            &mut column_mapping,
            "activity",
            &["activity", "activity_description", "activitydescription", "workout"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "powerTarget",
            &["powertarget", "power_target", "target", "intensity"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "fuelTier",
            &["fueltier", "fuel_tier", "fuel"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "coachNotes",
            &["coachnotes", "coach_notes", "notes"],
        );

        Self { column_mapping }
    }

    fn add_mapping(
        mapping: &mut HashMap<String, &'static str>,
        standard: &'static str,
        variations: &[&str],
    ) {
        for variation in variations {
            mapping.insert(variation.to_lowercase(), standard);
        }
    }

    fn normalize_field_name(&self, name: &str) -> Option<&'static str> {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");
        self.column_mapping.get(&normalized).copied()
    }

    /// Ingest a file, choosing the format from its extension
    pub fn ingest_file(&self, path: &Path) -> Result<IngestReport> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "json" => self.ingest_json_str(&fs::read_to_string(path)?),
            "csv" => self.ingest_csv(fs::File::open(path)?),
            other => Err(ReadyError::Configuration(format!(
                "unsupported directive file type '{}' for {}",
                other,
                path.display()
            ))),
        }
    }

    /// Ingest a JSON array of directive objects
    pub fn ingest_json_str(&self, content: &str) -> Result<IngestReport> {
        let document: Value = serde_json::from_str(content)?;
        let Value::Array(records) = document else {
            return Err(ReadyError::Configuration(
                "directive batch must be a JSON array".to_string(),
            ));
        };

        let raw = records
            .iter()
            .enumerate()
            .map(|(index, record)| match record {
                Value::Object(fields) => Ok(self.raw_from_json(fields)),
                _ => Err(ValidationFault::new(index, "record", "is not an object")),
            })
            .collect();

        Ok(self.validate_batch(raw))
    }

    /// Ingest CSV with a header row
    pub fn ingest_csv<R: Read>(&self, reader: R) -> Result<IngestReport> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<Option<&'static str>> = csv_reader
            .headers()
            .map_err(|e| ReadyError::Configuration(format!("unreadable CSV header: {}", e)))?
            .iter()
            .map(|h| self.normalize_field_name(h))
            .collect();

        let raw = csv_reader
            .records()
            .enumerate()
            .map(|(index, record)| -> std::result::Result<RawDirective, ValidationFault> {
                let record =
                    record.map_err(|e| ValidationFault::new(index, "record", e.to_string()))?;
                let mut raw = RawDirective::default();
                for (column, value) in headers.iter().zip(record.iter()) {
                    if let Some(field) = column {
                        Self::assign(&mut raw, field, value.to_string());
                    }
                }
                Ok(raw)
            })
            .collect();

        Ok(self.validate_batch(raw))
    }

    fn raw_from_json(&self, fields: &Map<String, Value>) -> RawDirective {
        let mut raw = RawDirective::default();
        for (key, value) in fields {
            let Some(field) = self.normalize_field_name(key) else {
                continue;
            };
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Null => continue,
                other => other.to_string(),
            };
            Self::assign(&mut raw, field, text);
        }
        raw
    }

    fn assign(raw: &mut RawDirective, field: &str, value: String) {
        let slot = match field {
            "date" => &mut raw.date,
            "activity" => &mut raw.activity,
            "powerTarget" => &mut raw.power_target,
            "fuelTier" => &mut raw.fuel_tier,
            "coachNotes" => &mut raw.coach_notes,
            _ => return,
        };
        *slot = Some(value);
    }

    fn validate_batch(
        &self,
        records: Vec<std::result::Result<RawDirective, ValidationFault>>,
    ) -> IngestReport {
        let mut report = IngestReport::default();
        let mut seen_dates: HashMap<NaiveDate, usize> = HashMap::new();

        for (index, record) in records.into_iter().enumerate() {
            let validated = record
                .and_then(|raw| Self::validate_record(index, raw))
                .and_then(|directive| match seen_dates.get(&directive.date) {
                    Some(first) => Err(ValidationFault::new(
                        index,
                        "date",
                        format!("{} already scheduled by record {}", directive.date, first),
                    )),
                    None => {
                        seen_dates.insert(directive.date, index);
                        Ok(directive)
                    }
                });

            match validated {
                Ok(directive) => report.accepted.push(directive),
                Err(fault) => {
                    warn!(%fault, "directive rejected");
                    report.faults.push(fault);
                }
            }
        }

        info!(
            accepted = report.success_count(),
            rejected = report.failure_count(),
            total = report.total(),
            "directive ingestion complete"
        );

        report
    }

    fn validate_record(
        index: usize,
        raw: RawDirective,
    ) -> std::result::Result<ScheduledDirective, ValidationFault> {
        let required = |value: Option<String>, field: &str| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ValidationFault::new(index, field, "is missing"))
        };

        let date_text = required(raw.date, "date")?;
        let date = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d").map_err(|_| {
            ValidationFault::new(
                index,
                "date",
                format!("'{}' is not a YYYY-MM-DD date", date_text),
            )
        })?;

        let activity_description = required(raw.activity, "activity")?;
        let power_target = required(raw.power_target, "powerTarget")?;
        let fuel_tier: FuelTier = required(raw.fuel_tier, "fuelTier")?
            .parse::<FuelTier>()
            .map_err(|reason| ValidationFault::new(index, "fuelTier", reason))?;

        Ok(ScheduledDirective {
            id: Uuid::new_v4(),
            date,
            activity_description,
            power_target,
            fuel_tier,
            coach_notes: raw.coach_notes.map(|n| n.trim().to_string()).unwrap_or_default(),
        })
    }
}
