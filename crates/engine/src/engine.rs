//! Engine assembly: queue + cache + worker pool + query APIs.
//!
//! The engine owns its queue and cache explicitly (no ambient statics)
//! and runs a fixed pool of workers for its whole lifetime. [`shutdown`]
//! is the explicit join path: it signals every worker to stop after its
//! current item and waits for all of them.
//!
//! [`shutdown`]: DiagnosticsEngine::shutdown

use std::{
  path::Path,
  sync::{Arc, Mutex},
};

use beacon_core::{Diagnostic, DiagnosticSnapshot, DocumentId, EngineConfig, ProjectId, WorkClass};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
  analyzer::{AnalyzeError, AnalyzerEngine},
  cache::DiagnosticsCache,
  listener::ChangeListener,
  queue::WorkQueue,
  report::{DiagnosticsSink, ProgressSink},
  worker::Worker,
  workspace::{Workspace, WorkspaceEvent},
};

/// The background diagnostics engine.
///
/// Construction spawns the worker pool immediately; work flows as soon
/// as something enqueues it (a [`ChangeListener`], or the queue APIs on
/// this type).
pub struct DiagnosticsEngine {
  config: EngineConfig,
  queue: Arc<WorkQueue>,
  cache: Arc<DiagnosticsCache>,
  workspace: Arc<dyn Workspace>,
  analyzer: Arc<dyn AnalyzerEngine>,
  cancel: CancellationToken,
  workers: Mutex<Vec<JoinHandle<()>>>,
}

impl DiagnosticsEngine {
  /// Build the engine and spawn its worker pool.
  pub fn start(
    config: EngineConfig,
    workspace: Arc<dyn Workspace>,
    analyzer: Arc<dyn AnalyzerEngine>,
    progress: Arc<dyn ProgressSink>,
    publisher: Arc<dyn DiagnosticsSink>,
  ) -> Self {
    let queue = Arc::new(WorkQueue::new());
    let cache = Arc::new(DiagnosticsCache::new());
    let cancel = CancellationToken::new();

    let worker_count = config.worker_count();
    let mut workers = Vec::with_capacity(worker_count);
    for id in 0..worker_count {
      let worker = Worker {
        id,
        queue: queue.clone(),
        cache: cache.clone(),
        workspace: workspace.clone(),
        analyzer: analyzer.clone(),
        progress: progress.clone(),
        publisher: publisher.clone(),
        analysis_timeout: config.analysis_timeout(),
        cancel: cancel.clone(),
      };
      workers.push(tokio::spawn(worker.run()));
    }

    info!(
      workers = worker_count,
      analysis_timeout_ms = config.analysis_timeout_ms,
      "Diagnostics engine started"
    );

    Self {
      config,
      queue,
      cache,
      workspace,
      analyzer,
      cancel,
      workers: Mutex::new(workers),
    }
  }

  /// The engine's work queue (shared with listeners and hosts).
  pub fn queue(&self) -> &Arc<WorkQueue> {
    &self.queue
  }

  /// The engine's result cache.
  pub fn cache(&self) -> &Arc<DiagnosticsCache> {
    &self.cache
  }

  /// Create the workspace event channel, sized by the configured
  /// `event_buffer`, and spawn a change listener consuming it. The
  /// returned sender is handed to the workspace host.
  pub fn change_listener_channel(&self) -> (mpsc::Sender<WorkspaceEvent>, ChangeListener) {
    let (tx, rx) = mpsc::channel(self.config.event_buffer);
    (tx, self.spawn_change_listener(rx))
  }

  /// Spawn a change listener feeding this engine from a caller-owned
  /// workspace event stream. Stop it explicitly with
  /// [`ChangeListener::stop`]; it also stops with the engine's shutdown.
  pub fn spawn_change_listener(&self, events: mpsc::Receiver<WorkspaceEvent>) -> ChangeListener {
    ChangeListener::spawn(
      self.queue.clone(),
      self.cache.clone(),
      self.workspace.clone(),
      events,
      self.cancel.child_token(),
    )
  }

  // ==========================================================================
  // Query APIs
  // ==========================================================================

  /// Fresh-results query for specific documents.
  ///
  /// Resolves the paths (silently dropping unresolvable ones), promotes
  /// each resolved document's pending item to Foreground, waits for the
  /// foreground backlog to drain — bounded by 3x the per-document
  /// timeout and by `token` — then returns whatever snapshots exist.
  /// Documents whose analysis has not completed are silently omitted.
  pub async fn get_diagnostics(&self, paths: &[&Path], token: &CancellationToken) -> Vec<DiagnosticSnapshot> {
    let documents: Vec<DocumentId> = paths.iter().filter_map(|path| self.workspace.resolve_path(path)).collect();

    for document in &documents {
      self.queue.try_promote(document);
    }

    let budget = 3 * self.config.analysis_timeout();
    if tokio::time::timeout(budget, self.queue.wait_foreground_complete(token))
      .await
      .is_err()
    {
      debug!(
        requested = paths.len(),
        budget_ms = budget.as_millis() as u64,
        "Foreground drain did not finish in time, returning what is cached"
      );
    }

    documents.iter().filter_map(|document| self.cache.get(document)).collect()
  }

  /// Eventually-consistent read of every known document's snapshot.
  /// No waiting, no promotion.
  pub fn get_all_diagnostics(&self) -> Vec<DiagnosticSnapshot> {
    self
      .workspace
      .all_documents()
      .iter()
      .filter_map(|document| self.cache.get(document))
      .collect()
  }

  /// Schedule a background sweep of every document in the workspace.
  /// Returns the enqueued ids without waiting.
  pub fn queue_all_documents(&self) -> Vec<DocumentId> {
    let documents = self.workspace.all_documents();
    let project_count = self.workspace.all_projects().len();
    if !documents.is_empty() {
      self
        .queue
        .put_work(&documents, WorkClass::Background, project_count, &self.cancel.child_token());
    }
    debug!(documents = documents.len(), projects = project_count, "Queued all documents for diagnostics");
    documents
  }

  /// Schedule a background sweep of the given projects' documents.
  /// Returns the enqueued ids without waiting.
  pub fn queue_project_documents(&self, projects: &[ProjectId]) -> Vec<DocumentId> {
    let documents: Vec<DocumentId> = projects
      .iter()
      .flat_map(|project| self.workspace.project_documents(project))
      .collect();
    if !documents.is_empty() {
      self
        .queue
        .put_work(&documents, WorkClass::Background, projects.len(), &self.cancel.child_token());
    }
    debug!(
      documents = documents.len(),
      projects = projects.len(),
      "Queued project documents for diagnostics"
    );
    documents
  }

  /// Compute fresh diagnostics for one document directly, bypassing the
  /// queue and the cache entirely. Immune to any queue backlog; bounded
  /// only by the caller's token.
  pub async fn analyze_document(
    &self,
    document: &DocumentId,
    token: CancellationToken,
  ) -> Result<Vec<Diagnostic>, AnalyzeError> {
    let Some(resolved) = self.workspace.resolve_document(document) else {
      debug!(document = %document, "Document does not resolve, nothing to analyze");
      return Ok(Vec::new());
    };
    self.analyzer.analyze(&resolved, token).await
  }

  /// Analyze the given projects' documents as Foreground work and wait
  /// for the foreground backlog to drain fully.
  ///
  /// Returns the union of cached diagnostics across *all* known
  /// documents, not only the given projects'; callers wanting a scoped
  /// result should filter the snapshots by project id.
  pub async fn analyze_projects(&self, projects: &[ProjectId], token: &CancellationToken) -> Vec<DiagnosticSnapshot> {
    let documents: Vec<DocumentId> = projects
      .iter()
      .flat_map(|project| self.workspace.project_documents(project))
      .collect();

    if !documents.is_empty() {
      self
        .queue
        .put_work(&documents, WorkClass::Foreground, projects.len(), token);
    }
    self.queue.wait_foreground_complete(token).await;

    self.get_all_diagnostics()
  }

  // ==========================================================================
  // Shutdown
  // ==========================================================================

  /// Stop every worker after its current item and join them all.
  pub async fn shutdown(&self) {
    info!("Diagnostics engine shutting down");
    self.cancel.cancel();

    let handles: Vec<JoinHandle<()>> = {
      let mut workers = self.workers.lock().expect("worker handle list poisoned");
      workers.drain(..).collect()
    };

    for handle in handles {
      if let Err(e) = handle.await {
        warn!(error = %e, "Worker task did not join cleanly");
      }
    }

    info!("Diagnostics engine stopped");
  }
}
