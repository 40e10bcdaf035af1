// Library interface for ReadyRS modules
// The CLI and the integration tests both go through these exports

pub mod analytics;
pub mod config;
pub mod decoupling;
pub mod engine;
pub mod error;
pub mod export;
pub mod ingest;
pub mod load;
pub mod logging;
pub mod mission;
pub mod models;
pub mod provider;
pub mod readiness;
pub mod store;
pub mod zones;

// Re-export commonly used types for convenience
pub use models::*;
pub use analytics::{analyze_session, analyze_sessions, SessionAnalysis};
pub use config::AppConfig;
pub use decoupling::{Decoupling, DecouplingAnalyzer, DecouplingStatus};
pub use engine::{DailyEngine, DailyEvaluation};
pub use error::{DataUnavailableFault, PersistenceFault, ReadyError, Result, ValidationFault};
pub use export::{AnalyticsExport, ExportFormat};
pub use ingest::{DirectiveIngestor, IngestReport};
pub use load::{LoadCalculator, LoadConfig, LoadProfile, StrainFlag};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use mission::{MissionConfig, MissionPlanner, PrescribedMission, ReadinessBand};
pub use provider::{InMemoryProvider, SessionSeries, TelemetryProvider};
pub use readiness::{ReadinessBreakdown, ReadinessCalculator, ReadinessCategory, ReadinessConfig, ReadinessInputs};
pub use store::{InMemoryStore, JsonFileStore, Snapshot, SnapshotStore};
pub use zones::{HrZone, ZoneAnalyzer, ZoneCalculator, ZoneDistribution};
