//! Analysis worker loop.
//!
//! Each worker repeatedly dequeues one item, invokes the analyzer under
//! the per-document timeout combined with the item's own cancellation
//! token, writes the result into the cache, and acknowledges the item.
//! Nothing that happens to a single item ever terminates the loop: a
//! failing, hanging, or cancelled analysis degrades to an empty result
//! for that document and the worker moves on.

use std::{sync::Arc, time::Duration};

use beacon_core::{Diagnostic, DiagnosticSnapshot, WorkClass};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::{
  analyzer::{AnalyzeError, AnalyzerEngine},
  cache::DiagnosticsCache,
  queue::{Batch, WorkItem, WorkQueue},
  report::{BackgroundStatus, DiagnosticsSink, ProgressSink},
  workspace::{ResolvedDocument, Workspace},
};

pub(crate) struct Worker {
  pub id: usize,
  pub queue: Arc<WorkQueue>,
  pub cache: Arc<DiagnosticsCache>,
  pub workspace: Arc<dyn Workspace>,
  pub analyzer: Arc<dyn AnalyzerEngine>,
  pub progress: Arc<dyn ProgressSink>,
  pub publisher: Arc<dyn DiagnosticsSink>,
  pub analysis_timeout: Duration,
  pub cancel: CancellationToken,
}

impl Worker {
  /// Run until the engine's shutdown token fires.
  pub async fn run(self) {
    debug!(worker = self.id, "Analysis worker started");

    loop {
      tokio::select! {
        biased;

        _ = self.cancel.cancelled() => {
          debug!(worker = self.id, "Analysis worker shutting down (cancelled)");
          break;
        }

        item = self.queue.take() => {
          self.process(item).await;
        }
      }
    }

    debug!(worker = self.id, "Analysis worker stopped");
  }

  async fn process(&self, item: WorkItem) {
    self.report_started(&item);

    match self.workspace.resolve_document(&item.document) {
      Some(document) => self.analyze_into_cache(&item, &document).await,
      // Removed between scheduling and dequeue: skip, still acknowledge
      None => trace!(document = %item.document, "Document no longer resolves, skipping analysis"),
    }

    // Acknowledge regardless of outcome so batch accounting terminates
    for (batch, remaining) in self.queue.work_complete(&item) {
      self.report_completion(&batch, remaining);
    }
  }

  /// Report batch-Started for any background batch seeing its first dequeue.
  fn report_started(&self, item: &WorkItem) {
    for batch in &item.batches {
      if batch.class == WorkClass::Background && batch.mark_started() {
        self
          .progress
          .report(BackgroundStatus::Started, batch.project_count, batch.document_count, batch.remaining());
      }
    }
  }

  /// Report Progress every Nth completed item and Finished on the last.
  fn report_completion(&self, batch: &Batch, remaining: usize) {
    if batch.class != WorkClass::Background {
      return;
    }

    if remaining == 0 {
      // The last item closes out the progress sequence before Finished
      self
        .progress
        .report(BackgroundStatus::Progress, batch.project_count, batch.document_count, 0);
      self
        .progress
        .report(BackgroundStatus::Finished, batch.project_count, batch.document_count, 0);
      return;
    }

    let stride = (batch.document_count / 100).max(10);
    let completed = batch.document_count.saturating_sub(remaining);
    if completed % stride == 0 {
      self
        .progress
        .report(BackgroundStatus::Progress, batch.project_count, batch.document_count, remaining);
    }
  }

  async fn analyze_into_cache(&self, item: &WorkItem, document: &ResolvedDocument) {
    let diagnostics = self.run_analysis(item, document).await;

    let snapshot = DiagnosticSnapshot {
      document: document.id,
      path: document.path.clone(),
      project: document.project,
      project_name: document.project_name.clone(),
      diagnostics,
    };

    self.cache.insert(snapshot.clone());
    self.publisher.publish(&snapshot.path, &snapshot.diagnostics).await;
  }

  /// Invoke the analyzer bounded by the per-document timeout and the
  /// item's caller token. Every failure mode degrades to an empty result.
  async fn run_analysis(&self, item: &WorkItem, document: &ResolvedDocument) -> Vec<Diagnostic> {
    let cancel = item.token.clone();

    let outcome = tokio::select! {
      _ = cancel.cancelled() => {
        debug!(document = %document.id, "Analysis cancelled by caller");
        return Vec::new();
      }
      outcome = tokio::time::timeout(
        self.analysis_timeout,
        self.analyzer.analyze(document, cancel.clone()),
      ) => outcome,
    };

    match outcome {
      Ok(Ok(diagnostics)) => {
        debug!(
          document = %document.id,
          diagnostics = diagnostics.len(),
          "Analysis complete"
        );
        diagnostics
      }
      Ok(Err(AnalyzeError::Cancelled)) => {
        debug!(document = %document.id, "Analysis cancelled by caller");
        Vec::new()
      }
      Ok(Err(e)) => {
        error!(
          document = %document.id,
          path = %document.path.display(),
          error = %e,
          "Analysis failed"
        );
        Vec::new()
      }
      Err(_) => {
        warn!(
          document = %document.id,
          path = %document.path.display(),
          timeout_ms = self.analysis_timeout.as_millis() as u64,
          "Analysis timed out"
        );
        Vec::new()
      }
    }
  }
}
