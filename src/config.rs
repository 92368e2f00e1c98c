//! Session configuration.
//!
//! Every field has a default, so an empty JSON object (or [`BridgeConfig::default`]) is
//! a valid configuration.

use crate::pipe::DEFAULT_BUFFER_SIZE;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Read buffer wrapped around downloaded content streams.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// What a teardown drain does after a sink fails to close.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainPolicy {
    /// Process every registered entry, then report the first close failure.
    #[default]
    BestEffort,
    /// Report the first close failure immediately; later entries stay registered.
    StopAtFirstFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Capacity in bytes of each upload pipe.
    pub pipe_buffer_size: usize,
    /// Capacity in bytes of the reader wrapped around downloads.
    pub read_buffer_size: usize,
    pub drain_policy: DrainPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            pipe_buffer_size: DEFAULT_BUFFER_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            drain_policy: DrainPolicy::default(),
        }
    }
}

impl BridgeConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON for this type or fails validation.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).context("parsing bridge config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading bridge config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("loading {}", path.display()))
    }

    /// Checks that both buffer sizes are non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending field.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.pipe_buffer_size > 0, "pipe_buffer_size must be > 0");
        ensure!(self.read_buffer_size > 0, "read_buffer_size must be > 0");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = BridgeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.pipe_buffer_size, 4096);
        assert_eq!(config.drain_policy, DrainPolicy::BestEffort);
    }

    #[test]
    fn test_partial_override() {
        let config = BridgeConfig::from_json_str(
            r#"{"pipe_buffer_size": 64, "drain_policy": "stop_at_first_failure"}"#,
        )
        .unwrap();
        assert_eq!(config.pipe_buffer_size, 64);
        assert_eq!(config.read_buffer_size, DEFAULT_READ_BUFFER_SIZE);
        assert_eq!(config.drain_policy, DrainPolicy::StopAtFirstFailure);
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let err = BridgeConfig::from_json_str(r#"{"read_buffer_size": 0}"#).unwrap_err();
        assert!(err.to_string().contains("read_buffer_size"));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(BridgeConfig::from_json_str(r#"{"drain_policy": "sometimes"}"#).is_err());
    }
}
