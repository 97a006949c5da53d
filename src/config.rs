//! Limits and switches for hosts running untrusted programs, read from the environment.
use std::str::FromStr;

use thiserror::Error;

/// Used when `SAFLANG_MAX_OPS` is not set.
pub const DEFAULT_MAX_OPS: u64 = 10_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Instruction limit for each run.
    pub max_op_count: u64,
    /// Log every executed instruction at the `trace` level.
    pub trace_steps: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to parse env var {key} with value {value}: {message}")]
    InvalidValue { key: String, value: String, message: String },
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig { max_op_count: DEFAULT_MAX_OPS, trace_steps: false }
    }
}

impl HostConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key-value source, `lookup` returns `None` for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = HostConfig::default();
        Ok(HostConfig {
            max_op_count: parse_value("SAFLANG_MAX_OPS", lookup("SAFLANG_MAX_OPS"))?
                .unwrap_or(defaults.max_op_count),
            trace_steps: parse_value("SAFLANG_TRACE", lookup("SAFLANG_TRACE"))?
                .unwrap_or(defaults.trace_steps),
        })
    }
}

fn parse_value<T>(key: &str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr + 'static, <T as FromStr>::Err: std::fmt::Display
{
    let Some(mut val) = value else {
        return Ok(None);
    };
    if val.is_empty() {
        return Ok(None);
    }
    if std::any::TypeId::of::<T>() == std::any::TypeId::of::<bool>() {
        val = val.to_lowercase();
        if val == "1" || val == "yes" {
            val = "true".to_string();
        } else if val == "0" || val == "no" {
            val = "false".to_string();
        }
    }
    match val.parse::<T>() {
        Ok(v) => Ok(Some(v)),
        Err(err) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: val,
            message: err.to_string(),
        }),
    }
}
