//! TOML-based application configuration.
//!
//! Stores the pipeline tunables:
//! - Intervention cooldown and history size
//! - Negotiation round limit
//! - Compliance warning window
//! - Enforcement grace period
//! - Monitor tick interval
//!
//! Configuration is stored at `~/.config/focusguard/config.toml`.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::compliance::DEFAULT_WARNING_BEFORE_SECONDS;
use crate::enforcement::DEFAULT_GRACE_PERIOD_SECONDS;
use crate::error::{ConfigError, CoreError, Result};
use crate::intervention::{DEFAULT_COOLDOWN_SECONDS, DEFAULT_HISTORY_CAPACITY};
use crate::negotiation::DEFAULT_MAX_NEGOTIATION_ROUNDS;

/// Returns `~/.config/focusguard[-dev]/` based on FOCUSGUARD_ENV.
///
/// Set FOCUSGUARD_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUSGUARD_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focusguard-dev")
    } else {
        base_dir.join("focusguard")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionConfig {
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: f64,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationConfig {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceConfig {
    #[serde(default = "default_warning_before_seconds")]
    pub warning_before_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcementConfig {
    #[serde(default = "default_grace_period_seconds")]
    pub grace_period_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
}

/// Longest accepted tick interval: one day.
pub const MAX_TICK_INTERVAL_SECS: u64 = 24 * 60 * 60;

impl MonitorConfig {
    /// Tick interval as a `Duration`, clamped to `1..=MAX_TICK_INTERVAL_SECS`.
    pub fn tick_interval(&self) -> Duration {
        let secs = self.tick_interval_secs.clamp(1, MAX_TICK_INTERVAL_SECS);
        i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or_else(|| Duration::seconds(1))
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focusguard/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub intervention: InterventionConfig,
    #[serde(default)]
    pub negotiation: NegotiationConfig,
    #[serde(default)]
    pub compliance: ComplianceConfig,
    #[serde(default)]
    pub enforcement: EnforcementConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

// Default functions
fn default_cooldown_seconds() -> f64 {
    DEFAULT_COOLDOWN_SECONDS
}
fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}
fn default_max_rounds() -> u32 {
    DEFAULT_MAX_NEGOTIATION_ROUNDS
}
fn default_warning_before_seconds() -> f64 {
    DEFAULT_WARNING_BEFORE_SECONDS
}
fn default_grace_period_seconds() -> f64 {
    DEFAULT_GRACE_PERIOD_SECONDS
}
fn default_tick_interval_secs() -> u64 {
    5
}

impl Default for InterventionConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: default_cooldown_seconds(),
            history_capacity: default_history_capacity(),
        }
    }
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
        }
    }
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            warning_before_seconds: default_warning_before_seconds(),
        }
    }
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            grace_period_seconds: default_grace_period_seconds(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot overwrite a whole section".to_string()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or fails validation.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Reject values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("intervention.cooldown_seconds", self.intervention.cooldown_seconds),
            ("compliance.warning_before_seconds", self.compliance.warning_before_seconds),
            ("enforcement.grace_period_seconds", self.enforcement.grace_period_seconds),
        ];
        for (key, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("must be a non-negative number, got {value}"),
                });
            }
        }
        if self.negotiation.max_rounds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "negotiation.max_rounds".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        let tick = self.monitor.tick_interval_secs;
        if !(1..=MAX_TICK_INTERVAL_SECS).contains(&tick) {
            return Err(ConfigError::InvalidValue {
                key: "monitor.tick_interval_secs".to_string(),
                message: format!("must be between 1 and {MAX_TICK_INTERVAL_SECS}, got {tick}"),
            });
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. The caller decides whether to
    /// persist with `save()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or fails validation. On error `self` is left unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| {
            CoreError::Config(ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.negotiation.max_rounds, 3);
        assert_eq!(parsed.enforcement.grace_period_seconds, 30.0);
    }

    #[test]
    fn config_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.intervention.cooldown_seconds, 60.0);
        assert_eq!(cfg.intervention.history_capacity, 50);
        assert_eq!(cfg.compliance.warning_before_seconds, 60.0);
        assert_eq!(cfg.monitor.tick_interval_secs, 5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = toml::from_str("[enforcement]\ngrace_period_seconds = 10.0\n").unwrap();
        assert_eq!(cfg.enforcement.grace_period_seconds, 10.0);
        assert_eq!(cfg.negotiation.max_rounds, 3);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("negotiation.max_rounds").as_deref(), Some("3"));
        assert_eq!(cfg.get("enforcement.grace_period_seconds").as_deref(), Some("30.0"));
        assert!(cfg.get("negotiation.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.set("negotiation.max_rounds", "5").unwrap();
        assert_eq!(cfg.negotiation.max_rounds, 5);
        cfg.set("intervention.cooldown_seconds", "12.5").unwrap();
        assert_eq!(cfg.intervention.cooldown_seconds, 12.5);
    }

    #[test]
    fn set_integer_into_float_field() {
        let mut cfg = Config::default();
        cfg.set("enforcement.grace_period_seconds", "45").unwrap();
        assert_eq!(cfg.enforcement.grace_period_seconds, 45.0);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set("negotiation.nonexistent", "1").unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_rejects_invalid_values_and_keeps_state() {
        let mut cfg = Config::default();
        assert!(cfg.set("negotiation.max_rounds", "lots").is_err());
        assert!(cfg.set("negotiation.max_rounds", "0").is_err());
        assert!(cfg.set("negotiation", "{}").is_err());
        assert_eq!(cfg.negotiation.max_rounds, 3);
    }

    #[test]
    fn validate_bounds_tick_interval() {
        let mut cfg = Config::default();
        for secs in [0, MAX_TICK_INTERVAL_SECS + 1, 10_000_000_000_000_000, u64::MAX] {
            cfg.monitor.tick_interval_secs = secs;
            assert!(matches!(cfg.validate(), Err(ConfigError::InvalidValue { .. })), "{secs}");
        }
        cfg.monitor.tick_interval_secs = MAX_TICK_INTERVAL_SECS;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn set_rejects_huge_tick_interval() {
        let mut cfg = Config::default();
        assert!(cfg.set("monitor.tick_interval_secs", "18446744073709551615").is_err());
        assert!(cfg.set("monitor.tick_interval_secs", "10000000000000000").is_err());
        assert_eq!(cfg.monitor.tick_interval_secs, 5);
    }

    #[test]
    fn tick_interval_is_clamped() {
        let mut monitor = MonitorConfig::default();
        assert_eq!(monitor.tick_interval(), Duration::seconds(5));
        monitor.tick_interval_secs = 0;
        assert_eq!(monitor.tick_interval(), Duration::seconds(1));
        monitor.tick_interval_secs = u64::MAX;
        assert_eq!(monitor.tick_interval(), Duration::days(1));
    }

    #[test]
    fn validate_rejects_negative_grace() {
        let mut cfg = Config::default();
        cfg.enforcement.grace_period_seconds = -1.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidValue { .. })));
    }
}
