use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::load::LoadConfig;
use crate::logging::LogConfig;
use crate::mission::MissionConfig;
use crate::models::ZoneThresholds;
use crate::readiness::ReadinessConfig;

/// Main application configuration
///
/// Every section has defaults, so a partial (or missing) file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// General application settings
    pub settings: AppSettings,

    /// Athlete heart rate zones and baselines
    pub zones: ZoneThresholds,

    /// Acute/chronic load windows and strain thresholds
    pub load: LoadConfig,

    /// Readiness baselines, weights and penalties
    pub readiness: ReadinessConfig,

    /// Mission readiness bands and the rest-day prescription
    pub mission: MissionConfig,

    /// Logging output
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        let now = Utc::now();
        ConfigMetadata {
            version: "1.0".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Data directory path
    pub data_dir: PathBuf,

    /// Store file name inside `data_dir`
    pub store_file: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            data_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".readyrs")
                .join("data"),
            store_file: "store.json".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            metadata: ConfigMetadata::default(),
            settings: AppSettings::default(),
            zones: ZoneThresholds::default(),
            load: LoadConfig::default(),
            readiness: ReadinessConfig::default(),
            mission: MissionConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| {
            format!("Failed to parse TOML configuration: {}", path.as_ref().display())
        })?;

        config.validate()?;
        debug!(path = %path.as_ref().display(), "configuration loaded");
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".readyrs")
            .join("config.toml")
    }

    /// Load configuration from `path` (or the default location)
    ///
    /// A missing file gives the defaults; a file that exists but cannot be
    /// read, parsed or validated is an error.
    pub fn load_if_present(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        if !config_path.exists() {
            debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        Self::load_from_file(&config_path)
            .with_context(|| format!("Invalid config file {}", config_path.display()))
    }

    /// Like [`AppConfig::load_if_present`], falling back to defaults when the
    /// file is unusable
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match Self::load_if_present(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "invalid config file, using defaults");
                Self::default()
            }
        }
    }

    /// Save configuration to default location
    pub fn save_default(&mut self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to_file(config_path)
    }

    /// Path of the JSON snapshot store
    pub fn store_path(&self) -> PathBuf {
        self.settings.data_dir.join(&self.settings.store_file)
    }

    /// Reject settings the engines cannot work with
    pub fn validate(&self) -> Result<()> {
        let z = &self.zones;
        if !(z.zone1_max < z.zone2_max && z.zone2_max < z.zone3_max && z.zone3_max < z.zone4_max) {
            anyhow::bail!(
                "Heart rate zones must be strictly increasing, got {}/{}/{}/{}",
                z.zone1_max,
                z.zone2_max,
                z.zone3_max,
                z.zone4_max
            );
        }

        if self.load.acute_window_days == 0 || self.load.acute_window_days >= self.load.chronic_window_days {
            anyhow::bail!(
                "Acute window ({} days) must be non-zero and shorter than the chronic window ({} days)",
                self.load.acute_window_days,
                self.load.chronic_window_days
            );
        }

        if self.load.low_strain_ratio >= self.load.high_strain_ratio {
            anyhow::bail!(
                "Low strain ratio {} must be below high strain ratio {}",
                self.load.low_strain_ratio,
                self.load.high_strain_ratio
            );
        }

        if self.mission.downgrade_below > self.mission.caution_below || self.mission.caution_below > 100 {
            anyhow::bail!(
                "Mission bands must satisfy downgrade ({}) <= caution ({}) <= 100",
                self.mission.downgrade_below,
                self.mission.caution_below
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.metadata.version, deserialized.metadata.version);
        assert_eq!(config.zones, deserialized.zones);
        assert_eq!(config.readiness, deserialized.readiness);
        assert_eq!(config.mission, deserialized.mission);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [zones]
            zone1_max = 125
            zone2_max = 145
            zone3_max = 160
            zone4_max = 175

            [load]
            high_strain_ratio = "1.4"
            "#,
        )
        .unwrap();

        assert_eq!(config.zones.zone1_max, 125);
        assert_eq!(config.zones.functional_threshold_power, 250);
        assert_eq!(config.load.high_strain_ratio, dec!(1.4));
        assert_eq!(config.load.chronic_window_days, 28);
        assert_eq!(config.mission, MissionConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original_config = AppConfig::default();
        original_config.zones.functional_threshold_power = 280;
        original_config.mission.caution_below = 70;

        original_config.save_to_file(&config_path).unwrap();
        let loaded_config = AppConfig::load_from_file(&config_path).unwrap();

        assert_eq!(loaded_config.zones.functional_threshold_power, 280);
        assert_eq!(loaded_config.mission.caution_below, 70);
        assert_eq!(loaded_config.settings, original_config.settings);
    }

    #[test]
    fn test_invalid_zones_rejected() {
        let mut config = AppConfig::default();
        config.zones.zone3_max = config.zones.zone2_max;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_load_windows_rejected() {
        let mut config = AppConfig::default();
        config.load.acute_window_days = 28;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_falls_back() {
        let temp_dir = tempdir().unwrap();
        let missing = temp_dir.path().join("missing.toml");
        assert_eq!(AppConfig::load_or_default(Some(missing.as_path())).zones, ZoneThresholds::default());

        let broken = temp_dir.path().join("broken.toml");
        fs::write(&broken, "[zones\nzone1_max = ").unwrap();
        assert_eq!(AppConfig::load_or_default(Some(broken.as_path())).load, LoadConfig::default());
    }

    #[test]
    fn test_load_if_present_reports_invalid_file() {
        let temp_dir = tempdir().unwrap();
        let missing = temp_dir.path().join("missing.toml");
        assert!(AppConfig::load_if_present(Some(missing.as_path())).is_ok());

        let broken = temp_dir.path().join("broken.toml");
        fs::write(&broken, "[zones\nzone1_max = ").unwrap();
        let error = AppConfig::load_if_present(Some(broken.as_path())).unwrap_err();
        assert!(format!("{:#}", error).contains("broken.toml"));

        let mut invalid = AppConfig::default();
        invalid.mission.downgrade_below = 90;
        invalid.mission.caution_below = 60;
        let rejected = temp_dir.path().join("rejected.toml");
        invalid.save_to_file(&rejected).unwrap();
        let error = AppConfig::load_if_present(Some(rejected.as_path())).unwrap_err();
        assert!(format!("{:#}", error).starts_with("Invalid config file"));
    }

    #[test]
    fn test_store_path() {
        let mut config = AppConfig::default();
        config.settings.data_dir = PathBuf::from("/tmp/readyrs");
        assert_eq!(config.store_path(), PathBuf::from("/tmp/readyrs/store.json"));
    }
}
