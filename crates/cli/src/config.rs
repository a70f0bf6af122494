//! pcsensor configuration management

use anyhow::{Context, Result, anyhow};
use protocol::DecodeScale;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub sensor: SensorSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralSettings {
    #[serde(default = "GeneralSettings::default_log_level")]
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

impl GeneralSettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

/// Sensor polling and USB transfer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSettings {
    /// Time between two readings, in milliseconds
    #[serde(default = "SensorSettings::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Timeout applied to every USB transfer, in milliseconds
    #[serde(default = "SensorSettings::default_timeout_ms")]
    pub timeout_ms: u64,
    /// Fixed-point scale used to decode raw samples
    #[serde(default)]
    pub decode_scale: DecodeScale,
    /// Open every attached sensor instead of the first one
    #[serde(default = "SensorSettings::default_all_devices")]
    pub all_devices: bool,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: Self::default_poll_interval_ms(),
            timeout_ms: Self::default_timeout_ms(),
            decode_scale: DecodeScale::default(),
            all_devices: Self::default_all_devices(),
        }
    }
}

impl SensorSettings {
    fn default_poll_interval_ms() -> u64 {
        1000
    }

    fn default_timeout_ms() -> u64 {
        1000
    }

    fn default_all_devices() -> bool {
        true
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default)]
    pub format: OutputFormat,
}

impl Config {
    /// Load configuration from the specified path
    ///
    /// Without a path the standard locations are searched in order.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => Self::find(&Self::candidate_paths())
                .ok_or_else(|| anyhow!("No configuration file found"))?,
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", config_path.display()))?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load the first configuration file found, or defaults if there is none
    ///
    /// A file that exists but cannot be read, parsed or validated is an error.
    pub fn load_or_default() -> Result<Self> {
        Self::load_first_or_default(&Self::candidate_paths())
    }

    fn load_first_or_default(candidates: &[PathBuf]) -> Result<Self> {
        match Self::find(candidates) {
            Some(path) => Self::load(Some(path)),
            None => Ok(Self::default()),
        }
    }

    /// Standard locations, in lookup order
    fn candidate_paths() -> Vec<PathBuf> {
        vec![
            Self::default_path(),
            PathBuf::from("/etc/pcsensor/pcsensor.toml"),
        ]
    }

    fn find(candidates: &[PathBuf]) -> Option<PathBuf> {
        candidates.iter().find(|p| p.exists()).cloned()
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("pcsensor").join("pcsensor.toml")
        } else {
            PathBuf::from(".config/pcsensor/pcsensor.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        Self::validate_log_level(&self.general.log_level)?;

        if self.sensor.poll_interval_ms == 0 {
            return Err(anyhow!("poll_interval_ms must be greater than zero"));
        }
        if self.sensor.timeout_ms == 0 {
            return Err(anyhow!("timeout_ms must be greater than zero"));
        }

        Ok(())
    }

    fn validate_log_level(level: &str) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Load a configuration file, expanding a leading `~`
pub fn load_config(path: &Path) -> Result<Config> {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    Config::load(Some(PathBuf::from(expanded)))
}
