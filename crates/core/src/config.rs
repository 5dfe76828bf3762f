//! Engine configuration.
//!
//! All fields have defaults, so an empty TOML file (or no file at all)
//! yields a working configuration. Hosts own config discovery; this
//! module only parses an explicit file when given one.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration for the diagnostics engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Number of analysis workers (default: 0 = one per CPU)
  pub workers: usize,

  /// Per-document analysis timeout in milliseconds (default: 10000)
  ///
  /// Bounds the damage of a pathological analyzer that hangs; a timed-out
  /// document gets an empty result and the worker moves on.
  pub analysis_timeout_ms: u64,

  /// Buffer size of the workspace event channel feeding the change
  /// listener (default: 256)
  pub event_buffer: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      workers: 0,
      analysis_timeout_ms: 10_000,
      event_buffer: 256,
    }
  }
}

impl EngineConfig {
  /// Load configuration from a TOML file, falling back to defaults if
  /// the file is missing or malformed.
  pub fn load(path: &Path) -> Self {
    if path.exists()
      && let Ok(content) = std::fs::read_to_string(path)
    {
      match toml::from_str(&content) {
        Ok(config) => return config,
        Err(e) => {
          tracing::warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
        }
      }
    }

    Self::default()
  }

  /// Resolved worker pool size (0 means one worker per CPU).
  pub fn worker_count(&self) -> usize {
    if self.workers == 0 { num_cpus::get() } else { self.workers }
  }

  /// Per-document analysis timeout as a `Duration`.
  pub fn analysis_timeout(&self) -> std::time::Duration {
    std::time::Duration::from_millis(self.analysis_timeout_ms)
  }
}
