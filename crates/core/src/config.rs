//! Application configuration.

use serde::{Deserialize, Serialize};
use crate::estimate::EstimationStyle;

/// Errors raised while validating or editing configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Unknown configuration key
    #[error("unknown config key '{0}'")]
    UnknownKey(String),

    /// Value could not be parsed or is out of range
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue {
        /// Key being set
        key: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Estimation and reporting settings, persisted as `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Central tendency reported for historical estimates
    pub estimation_style: EstimationStyle,

    /// Minimum samples before history replaces the seed estimate
    pub min_samples: usize,

    /// Relative deviation from the median above which a sample is an anomaly (2.0 = 200%)
    pub anomaly_threshold: f64,

    /// Drop anomalous samples before computing statistics
    pub exclude_anomalies: bool,

    /// Relative seed error still considered accurate during reconciliation
    pub seed_tolerance: f64,

    /// Working hours per day, used when reporting in days
    pub hours_per_day: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            estimation_style: EstimationStyle::Median,
            min_samples: 3,
            anomaly_threshold: 2.0,
            exclude_anomalies: true,
            seed_tolerance: 0.25,
            hours_per_day: 8.0,
        }
    }
}

impl AppConfig {
    /// Keys accepted by [`AppConfig::set`].
    pub const KEYS: [&'static str; 6] = [
        "estimation_style",
        "min_samples",
        "anomaly_threshold",
        "exclude_anomalies",
        "seed_tolerance",
        "hours_per_day",
    ];

    /// Check that every field is within range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_samples < 1 {
            return Err(invalid("min_samples", "must be at least 1"));
        }
        if !(self.anomaly_threshold.is_finite() && self.anomaly_threshold > 0.0) {
            return Err(invalid("anomaly_threshold", "must be a positive number"));
        }
        if !(self.seed_tolerance.is_finite() && (0.0..1.0).contains(&self.seed_tolerance)) {
            return Err(invalid("seed_tolerance", "must be in [0, 1)"));
        }
        if !(self.hours_per_day.is_finite() && self.hours_per_day > 0.0) {
            return Err(invalid("hours_per_day", "must be a positive number"));
        }
        Ok(())
    }

    /// Set one key from its string form. The config is left unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut next = self.clone();
        let value = value.trim();
        match key {
            "estimation_style" => {
                next.estimation_style = value.parse().map_err(|e: String| invalid(key, &e))?;
            }
            "min_samples" => {
                next.min_samples = value
                    .parse()
                    .map_err(|_| invalid(key, "expected a whole number"))?;
            }
            "anomaly_threshold" => next.anomaly_threshold = parse_f64(key, value)?,
            "exclude_anomalies" => {
                next.exclude_anomalies = match value.to_lowercase().as_str() {
                    "true" | "yes" | "1" | "on" => true,
                    "false" | "no" | "0" | "off" => false,
                    _ => return Err(invalid(key, "expected true or false")),
                };
            }
            "seed_tolerance" => next.seed_tolerance = parse_f64(key, value)?,
            "hours_per_day" => next.hours_per_day = parse_f64(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Current value of a key as a string.
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        Ok(match key {
            "estimation_style" => self.estimation_style.to_string(),
            "min_samples" => self.min_samples.to_string(),
            "anomaly_threshold" => self.anomaly_threshold.to_string(),
            "exclude_anomalies" => self.exclude_anomalies.to_string(),
            "seed_tolerance" => self.seed_tolerance.to_string(),
            "hours_per_day" => self.hours_per_day.to_string(),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        })
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse().map_err(|_| invalid(key, "expected a number"))
}
