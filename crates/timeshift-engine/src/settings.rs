//! User settings, settings messages and engine configuration.
//!
//! `Settings` mirrors what the configuration popup stores (`mode`, `delay`,
//! `enabled`). `EngineConfig` holds the tunables and is persisted as a
//! versioned JSON file.

use crate::timing::TimingPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use timeshift_core::limits::{
    DRAIN_BOUND, HIGH_REFRESH_THRESHOLD, NOMINAL_REFRESH_INTERVAL, POOL_CAPACITY,
    REFRESH_SAMPLE_SIZE,
};
use timeshift_core::{Delay, Result, TimeshiftError};

/// Which output path is delayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DelayMode {
    /// Video frames and captions through GPU overlays.
    #[default]
    Video,
    /// Audio only, through the delay graph.
    Audio,
}

/// Persisted user choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub mode: DelayMode,
    #[serde(default)]
    pub delay: Delay,
    #[serde(default)]
    pub enabled: bool,
}

impl Settings {
    pub fn new(mode: DelayMode, delay: Delay, enabled: bool) -> Self {
        Self {
            mode,
            delay,
            enabled,
        }
    }

    /// Settings after `message`. Fields a message does not carry keep their
    /// stored value.
    pub fn apply(self, message: &SettingsMessage) -> Self {
        match *message {
            SettingsMessage::SetDelay {
                delay,
                mode,
                enabled,
            } => Self {
                mode: mode.unwrap_or(self.mode),
                delay,
                enabled: enabled.unwrap_or(self.enabled),
            },
            SettingsMessage::UpdateDelay { delay } => Self { delay, ..self },
        }
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data)
            .map_err(|e| TimeshiftError::Serialization(format!("Invalid settings: {}", e)))
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}

/// Update broadcast by the settings surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SettingsMessage {
    /// Full reconfiguration: everything stops, then restarts per the new settings.
    SetDelay {
        delay: Delay,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mode: Option<DelayMode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        enabled: Option<bool>,
    },
    /// Delay change only; running capture and render state is kept.
    UpdateDelay { delay: Delay },
}

impl SettingsMessage {
    /// Parse one JSON message.
    pub fn from_json(line: &str) -> Result<Self> {
        serde_json::from_str(line)
            .map_err(|e| TimeshiftError::Serialization(format!("Invalid settings message: {}", e)))
    }
}

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Idle textures kept per scheduler.
    pub pool_capacity: usize,
    /// Wait before detached GPU resources are deleted, in milliseconds.
    pub drain_bound_ms: u64,
    /// Refresh intervals averaged when classifying the display.
    pub refresh_sample_size: usize,
    /// Average interval below which wall-clock timing takes over, in milliseconds.
    pub high_refresh_threshold_ms: f64,
    /// Interval used to convert a delay into refreshes, in microseconds.
    pub nominal_refresh_interval_us: u64,
    pub timing_policy: TimingPolicy,
    pub audio_sample_rate: u32,
    pub audio_channels: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_capacity: POOL_CAPACITY,
            drain_bound_ms: DRAIN_BOUND.as_millis() as u64,
            refresh_sample_size: REFRESH_SAMPLE_SIZE,
            high_refresh_threshold_ms: HIGH_REFRESH_THRESHOLD.as_secs_f64() * 1000.0,
            nominal_refresh_interval_us: NOMINAL_REFRESH_INTERVAL.as_micros() as u64,
            timing_policy: TimingPolicy::Adaptive,
            audio_sample_rate: 48_000,
            audio_channels: 2,
        }
    }
}

impl EngineConfig {
    pub fn drain_bound(&self) -> Duration {
        Duration::from_millis(self.drain_bound_ms)
    }

    pub fn high_refresh_threshold(&self) -> Duration {
        Duration::from_secs_f64(self.high_refresh_threshold_ms.max(0.0) / 1000.0)
    }

    pub fn nominal_refresh_interval(&self) -> Duration {
        Duration::from_micros(self.nominal_refresh_interval_us.max(1))
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.refresh_sample_size == 0 {
            return Err(TimeshiftError::InvalidParameter(
                "refresh_sample_size must be at least 1".to_string(),
            ));
        }
        if !self.high_refresh_threshold_ms.is_finite() || self.high_refresh_threshold_ms < 0.0 {
            return Err(TimeshiftError::InvalidParameter(format!(
                "high_refresh_threshold_ms must be a non-negative number, got {}",
                self.high_refresh_threshold_ms
            )));
        }
        if self.audio_sample_rate == 0 || self.audio_channels == 0 {
            return Err(TimeshiftError::InvalidParameter(
                "audio format must have a non-zero rate and channel count".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let config = ConfigFile::load_from_file(path)?.config;
        config.validate()?;
        Ok(config)
    }
}

/// `<config dir>/timeshift/config.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("timeshift").join("config.json"))
}

/// Current config schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Versioned config file wrapper.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: u32,
    pub config: EngineConfig,
    /// Application version that wrote this file.
    pub app_version: String,
}

impl ConfigFile {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            version: CURRENT_VERSION,
            config,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| TimeshiftError::Serialization(format!("Failed to serialize config: {}", e)))
    }

    /// Deserialize, migrating older layouts.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| TimeshiftError::Serialization(format!("Invalid JSON: {}", e)))?;

        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;

        if version > CURRENT_VERSION {
            return Err(TimeshiftError::Serialization(format!(
                "Config file version {} is newer than supported version {}",
                version, CURRENT_VERSION
            )));
        }

        let migrated = migrate(raw, version)?;

        serde_json::from_value(migrated)
            .map_err(|e| TimeshiftError::Serialization(format!("Failed to parse config: {}", e)))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}

fn migrate(mut data: serde_json::Value, from_version: u32) -> Result<serde_json::Value> {
    let mut version = from_version;

    while version < CURRENT_VERSION {
        match version {
            0 => {
                // v0 was the bare config object
                data = serde_json::json!({
                    "version": 1,
                    "config": data,
                    "app_version": "0.0.0",
                });
                version = 1;
            }
            _ => {
                return Err(TimeshiftError::Serialization(format!(
                    "No migration path from version {}",
                    version
                )));
            }
        }
    }

    Ok(data)
}
