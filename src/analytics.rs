//! Per-session physiological analytics
//!
//! Bundles aerobic decoupling and heart-rate zone distribution for one
//! session's telemetry. Sessions are independent, so batches are analysed in
//! parallel without any shared state.

use crate::decoupling::{Decoupling, DecouplingAnalyzer};
use crate::models::{SessionRecord, ZoneThresholds};
use crate::provider::SessionSeries;
use crate::zones::{ZoneAnalyzer, ZoneDistribution};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Analytics for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAnalysis {
    pub session_id: Uuid,

    /// `None` when the series were too short or had no heart rate
    pub decoupling: Option<Decoupling>,

    pub zones: ZoneDistribution,
}

/// Analyse one session's telemetry
pub fn analyze_session(
    session: &SessionRecord,
    series: &SessionSeries,
    zones: &ZoneThresholds,
) -> SessionAnalysis {
    let heart_rate = SessionSeries::values(&series.heart_rate);
    let power = SessionSeries::values(&series.power);

    let decoupling = DecouplingAnalyzer::analyze(&heart_rate, &power);
    let distribution = ZoneAnalyzer::analyze_hr_distribution(&series.heart_rate, zones);

    debug!(
        session = %session.id,
        decoupling_pct = decoupling.map(|d| d.decoupling_pct),
        zone_minutes = %distribution.total_minutes,
        "session analysed"
    );

    SessionAnalysis {
        session_id: session.id,
        decoupling,
        zones: distribution,
    }
}

/// Analyse many sessions in parallel; output order follows input order
pub fn analyze_sessions(
    sessions: &[(SessionRecord, SessionSeries)],
    zones: &ZoneThresholds,
) -> Vec<SessionAnalysis> {
    sessions
        .par_iter()
        .map(|(session, series)| analyze_session(session, series, zones))
        .collect()
}
