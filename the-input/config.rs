//! Reconciler timing and heuristics.

use std::{
  fs,
  io::Error as IOError,
  path::Path,
  time::Duration,
};

use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;
use toml::de::Error as TomlError;

use crate::hint::InsertionHintPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ReconcilerConfig {
  /// Wait after a composition end before flushing, so duplicate end events
  /// collapse into one.
  pub resolve_delay_ms: u64,
  /// Idle time after a selection report before buffered diffs are flushed.
  pub flush_delay_ms:   u64,
  /// Delay before a scheduled action runs when no input event follows.
  pub action_delay_ms:  u64,
  pub insertion_hint:   InsertionHintPolicy,
}

impl Default for ReconcilerConfig {
  fn default() -> Self {
    Self {
      resolve_delay_ms: 25,
      flush_delay_ms:   200,
      action_delay_ms:  0,
      insertion_hint:   InsertionHintPolicy::Enabled,
    }
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read reconciler config: {0}")]
  Io(#[from] IOError),
  #[error("bad reconciler config: {0}")]
  BadConfig(#[from] TomlError),
}

impl ReconcilerConfig {
  pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(source)?)
  }

  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::from_toml(&fs::read_to_string(path)?)
  }

  pub fn resolve_delay(&self) -> Duration {
    Duration::from_millis(self.resolve_delay_ms)
  }

  pub fn flush_delay(&self) -> Duration {
    Duration::from_millis(self.flush_delay_ms)
  }

  pub fn action_delay(&self) -> Duration {
    Duration::from_millis(self.action_delay_ms)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_fields_keep_defaults() {
    let config = ReconcilerConfig::from_toml("flush-delay-ms = 50\n").unwrap();
    assert_eq!(config.flush_delay(), Duration::from_millis(50));
    assert_eq!(config.resolve_delay(), Duration::from_millis(25));
    assert_eq!(config.insertion_hint, InsertionHintPolicy::Enabled);

    let config = ReconcilerConfig::from_toml("insertion-hint = \"disabled\"").unwrap();
    assert_eq!(config.insertion_hint, InsertionHintPolicy::Disabled);
  }

  #[test]
  fn unknown_fields_are_rejected() {
    assert!(matches!(
      ReconcilerConfig::from_toml("flush-delay = 50"),
      Err(ConfigError::BadConfig(_))
    ));
  }
}
