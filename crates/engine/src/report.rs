//! Outbound reporting boundaries.
//!
//! Both sinks are trait objects so the delivery transport stays outside
//! the engine: a language-server host pushes over its protocol, tests
//! record into vectors.

use std::path::Path;

use async_trait::async_trait;
use beacon_core::Diagnostic;

/// Phase of a background sweep, derived from batch drain counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundStatus {
  /// First item of a batch was dequeued.
  Started,
  /// Periodic progress while the batch drains.
  Progress,
  /// The batch's last item was acknowledged.
  Finished,
}

/// Receives background batch status reports.
pub trait ProgressSink: Send + Sync {
  fn report(&self, status: BackgroundStatus, project_count: usize, document_count: usize, remaining: usize);
}

/// Receives a per-document notification after every cache update.
#[async_trait]
pub trait DiagnosticsSink: Send + Sync {
  async fn publish(&self, path: &Path, diagnostics: &[Diagnostic]);
}
