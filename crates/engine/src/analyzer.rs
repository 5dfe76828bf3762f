//! Analyzer boundary.
//!
//! The actual diagnostics computation is an external collaborator. The
//! engine only needs one operation from it and a two-way error split:
//! cancellation (logged quietly) versus analyzer defects (logged loudly,
//! converted to an empty result by the worker loop).

use async_trait::async_trait;
use beacon_core::Diagnostic;
use tokio_util::sync::CancellationToken;

use crate::workspace::ResolvedDocument;

/// Errors surfaced by an analyzer invocation.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
  /// The supplied cancellation token fired mid-analysis.
  #[error("Analysis cancelled")]
  Cancelled,

  /// An analyzer defect (bad plugin, internal panic caught by the
  /// engine host, ...). Never fatal to the engine.
  #[error("Analyzer failure: {0}")]
  Failed(String),
}

/// Computes diagnostics for one document against its compiled context.
#[async_trait]
pub trait AnalyzerEngine: Send + Sync {
  /// Analyze a single resolved document.
  ///
  /// Implementations should observe `cancel` at their own suspension
  /// points and return [`AnalyzeError::Cancelled`] once it fires; the
  /// engine additionally bounds every invocation with its per-document
  /// timeout, so a non-cooperative analyzer is still contained.
  async fn analyze(
    &self,
    document: &ResolvedDocument,
    cancel: CancellationToken,
  ) -> Result<Vec<Diagnostic>, AnalyzeError>;
}
