//! Analytics export
//!
//! A read-only document handed to external analysis tools: session metadata,
//! scalar averages and the raw sensor vectors with timestamps stripped.

use crate::analytics::SessionAnalysis;
use crate::decoupling::Decoupling;
use crate::load::LoadCalculator;
use crate::models::{Discipline, SessionRecord, TimeSeriesPoint};
use crate::provider::SessionSeries;
use crate::zones::ZoneDistribution;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub mod csv;
pub mod json;

/// Version of the export document layout
pub const EXPORT_SCHEMA_VERSION: u32 = 1;

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    /// Full document, pretty-printed
    Json,
    /// Sensor vectors only, one row per sample index
    Csv,
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] ::csv::Error),
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}

/// Identifying and summary fields of the exported session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: Uuid,
    pub date: NaiveDate,
    pub discipline: Discipline,
    pub duration_minutes: Decimal,
    pub distance_km: Decimal,
    pub rpe: u8,

    /// Session-RPE load (minutes × RPE)
    pub session_load: Decimal,

    pub elevation_gain_m: Option<u16>,
    pub linked_directive_id: Option<Uuid>,
}

/// Whole-session averages
///
/// Taken from the session record when it carries them, otherwise from the
/// mean of the corresponding sensor vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarAverages {
    pub heart_rate: Option<f64>,
    pub power: Option<f64>,
    pub cadence: Option<f64>,
    pub ground_contact_time_ms: Option<f64>,
    pub vertical_oscillation_cm: Option<f64>,
}

/// Raw sensor values in sample order, timestamps stripped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesVectors {
    pub heart_rate: Vec<f64>,
    pub power: Vec<f64>,
    pub cadence: Vec<f64>,
    pub ground_contact_time: Vec<f64>,
    pub vertical_oscillation: Vec<f64>,
}

impl SeriesVectors {
    pub fn from_series(series: &SessionSeries) -> Self {
        SeriesVectors {
            heart_rate: SessionSeries::values(&series.heart_rate),
            power: SessionSeries::values(&series.power),
            cadence: SessionSeries::values(&series.cadence),
            ground_contact_time: SessionSeries::values(&series.ground_contact_time),
            vertical_oscillation: SessionSeries::values(&series.vertical_oscillation),
        }
    }

    /// Length of the longest vector
    pub fn max_len(&self) -> usize {
        [
            self.heart_rate.len(),
            self.power.len(),
            self.cadence.len(),
            self.ground_contact_time.len(),
            self.vertical_oscillation.len(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.max_len() == 0
    }
}

/// Derived analytics included when they were computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedAnalytics {
    pub decoupling: Option<Decoupling>,
    pub zones: ZoneDistribution,
}

/// The export document for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsExport {
    pub schema_version: u32,
    pub session: SessionMetadata,
    pub averages: ScalarAverages,
    pub series: SeriesVectors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics: Option<ExportedAnalytics>,
}

impl AnalyticsExport {
    pub fn build(
        session: &SessionRecord,
        series: &SessionSeries,
        analysis: Option<&SessionAnalysis>,
    ) -> Self {
        let metadata = SessionMetadata {
            session_id: session.id,
            date: session.date,
            discipline: session.discipline,
            duration_minutes: session.duration_minutes,
            distance_km: session.distance_km,
            rpe: session.rpe,
            session_load: LoadCalculator::session_load(session),
            elevation_gain_m: session.elevation_gain_m,
            linked_directive_id: session.linked_directive_id,
        };

        let averages = ScalarAverages {
            heart_rate: Some(f64::from(session.average_hr))
                .filter(|hr| *hr > 0.0)
                .or_else(|| series_mean(&series.heart_rate)),
            power: session
                .avg_power
                .map(f64::from)
                .or_else(|| series_mean(&series.power)),
            cadence: session
                .avg_cadence
                .map(f64::from)
                .or_else(|| series_mean(&series.cadence)),
            ground_contact_time_ms: session
                .ground_contact_time_ms
                .map(f64::from)
                .or_else(|| series_mean(&series.ground_contact_time)),
            vertical_oscillation_cm: session
                .vertical_oscillation_cm
                .and_then(|v| v.to_f64())
                .or_else(|| series_mean(&series.vertical_oscillation)),
        };

        AnalyticsExport {
            schema_version: EXPORT_SCHEMA_VERSION,
            session: metadata,
            averages,
            series: SeriesVectors::from_series(series),
            analytics: analysis.map(|a| ExportedAnalytics {
                decoupling: a.decoupling,
                zones: a.zones.clone(),
            }),
        }
    }
}

fn series_mean(points: &[TimeSeriesPoint]) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    let mean = points.iter().map(|p| p.value).mean();
    mean.is_finite().then_some(mean)
}

/// Write `export` to `output_path` in `format`
pub fn export_analytics<P: AsRef<Path>>(
    export: &AnalyticsExport,
    format: ExportFormat,
    output_path: P,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Json => json::export_json(export, output_path),
        ExportFormat::Csv => csv::export_series_vectors(&export.series, output_path),
    }
}
