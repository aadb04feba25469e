//! Configuration file support for Pillwatch.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/pillwatch/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub alerts: AlertConfig,

    #[serde(default)]
    pub sweep: SweepConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Low-stock alert configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Alert once the remaining supply drops to this many days or fewer
    #[serde(default = "default_low_stock_threshold_days")]
    pub low_stock_threshold_days: i64,

    /// How long a snooze suppresses repeat alerts for one medicine
    #[serde(default = "default_snooze_duration_minutes")]
    pub snooze_duration_minutes: i64,

    /// Recipient handed to the delivery collaborator
    #[serde(default = "default_recipient")]
    pub recipient: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold_days: default_low_stock_threshold_days(),
            snooze_duration_minutes: default_snooze_duration_minutes(),
            recipient: default_recipient(),
        }
    }
}

impl AlertConfig {
    /// Snooze duration as a chrono duration
    pub fn snooze_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.snooze_duration_minutes)
    }
}

/// Sweep loop configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Minutes between sweep ticks
    #[serde(default = "default_sweep_interval_minutes")]
    pub interval_minutes: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_sweep_interval_minutes(),
        }
    }
}

impl SweepConfig {
    /// Tick interval as a std duration
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_minutes * 60)
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME")
            .expect("HOME environment variable not set");
        PathBuf::from(home).join(".local/share")
    });
    base.join("pillwatch")
}

fn default_low_stock_threshold_days() -> i64 {
    3
}

fn default_snooze_duration_minutes() -> i64 {
    60
}

fn default_recipient() -> String {
    "pillwatch@localhost".into()
}

fn default_sweep_interval_minutes() -> u64 {
    60
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME")
                .expect("HOME environment variable not set");
            PathBuf::from(home).join(".config")
        });
        base.join("pillwatch").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
