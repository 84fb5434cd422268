//! Configuration management

use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub pinctrl: PinctrlConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub gps: GpsConfig,
    #[serde(default)]
    pub tray: TrayConfig,
    #[serde(default)]
    pub autostart: AutostartConfig,
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

        let app_config_dir = config_dir.join("aiov2_ctl");

        if !app_config_dir.exists() {
            fs::create_dir_all(&app_config_dir)?;
        }

        Ok(app_config_dir.join("config.toml"))
    }

    /// Load configuration from disk, writing defaults on first run
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.general.refresh_rate_ms == 0 {
            return Err(Error::Config("refresh_rate_ms must be greater than zero".to_string()));
        }
        if self.telemetry.noise_threshold_watts < 0.0 {
            return Err(Error::Config("noise_threshold_watts must not be negative".to_string()));
        }
        if self.tray.refresh_budget_ms == 0 {
            return Err(Error::Config("refresh_budget_ms must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Poll period for --power, --watch and the tray, in milliseconds
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate_ms: u64,
    /// Default log filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_refresh_rate() -> u64 { 1000 }
fn default_log_level() -> String { "warn".to_string() }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            refresh_rate_ms: default_refresh_rate(),
            log_level: default_log_level(),
        }
    }
}

/// Pin control utility settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinctrlConfig {
    /// Binary name or path of the pin control utility
    #[serde(default = "default_pinctrl_binary")]
    pub binary: String,
}

fn default_pinctrl_binary() -> String { "pinctrl".to_string() }

impl Default for PinctrlConfig {
    fn default() -> Self {
        Self {
            binary: default_pinctrl_binary(),
        }
    }
}

/// Power telemetry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Kernel power-supply class directory
    #[serde(default = "default_power_supply_dir")]
    pub power_supply_dir: PathBuf,
    /// Deltas smaller than this are displayed as zero
    #[serde(default = "default_noise_threshold")]
    pub noise_threshold_watts: f64,
}

fn default_power_supply_dir() -> PathBuf { PathBuf::from("/sys/class/power_supply") }
fn default_noise_threshold() -> f64 { 0.05 }

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            power_supply_dir: default_power_supply_dir(),
            noise_threshold_watts: default_noise_threshold(),
        }
    }
}

/// GPS detail probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpsConfig {
    #[serde(default = "default_gpspipe_binary")]
    pub gpspipe_binary: String,
    #[serde(default = "default_lsof_binary")]
    pub lsof_binary: String,
    /// How long gpspipe may listen for reports
    #[serde(default = "default_probe_seconds")]
    pub probe_seconds: u64,
}

fn default_gpspipe_binary() -> String { "gpspipe".to_string() }
fn default_lsof_binary() -> String { "lsof".to_string() }
fn default_probe_seconds() -> u64 { 1 }

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            gpspipe_binary: default_gpspipe_binary(),
            lsof_binary: default_lsof_binary(),
            probe_seconds: default_probe_seconds(),
        }
    }
}

/// Tray shell settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrayConfig {
    /// Time a single refresh may take before the previous snapshot is kept
    #[serde(default = "default_refresh_budget")]
    pub refresh_budget_ms: u64,
    /// Icon theme name shown in the tray and autostart entry
    #[serde(default = "default_icon_theme")]
    pub icon_theme: String,
}

fn default_refresh_budget() -> u64 { 500 }
fn default_icon_theme() -> String { "utilities-system-monitor".to_string() }

impl Default for TrayConfig {
    fn default() -> Self {
        Self {
            refresh_budget_ms: default_refresh_budget(),
            icon_theme: default_icon_theme(),
        }
    }
}

/// Login autostart settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutostartConfig {
    /// Seconds to wait after login before launching the tray
    #[serde(default = "default_autostart_delay")]
    pub delay_secs: u64,
    /// Command used to launch the tray
    #[serde(default = "default_autostart_command")]
    pub command: String,
}

fn default_autostart_delay() -> u64 { 10 }
fn default_autostart_command() -> String { "aiov2_ctl".to_string() }

impl Default for AutostartConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_autostart_delay(),
            command: default_autostart_command(),
        }
    }
}
