//! Shared fixtures: programmable stub analyzer, in-memory workspace,
//! recording sinks, and an engine context wired from all of them.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  sync::{Arc, Mutex},
  time::{Duration, Instant},
};

use async_trait::async_trait;
use beacon_core::{
  Diagnostic, DiagnosticSeverity, DiagnosticSnapshot, DocumentId, EngineConfig, ProjectId, Span,
};
use tokio_util::sync::CancellationToken;

use crate::{
  analyzer::{AnalyzeError, AnalyzerEngine},
  engine::DiagnosticsEngine,
  report::{BackgroundStatus, DiagnosticsSink, ProgressSink},
  workspace::{ResolvedDocument, Workspace},
};

// ============================================================================
// Diagnostics
// ============================================================================

pub fn warning(message: &str) -> Diagnostic {
  Diagnostic {
    severity: DiagnosticSeverity::Warning,
    span: Span::default(),
    code: "TEST001".into(),
    message: message.into(),
  }
}

// ============================================================================
// Stub Analyzer
// ============================================================================

/// What the stub analyzer should do for one document.
#[derive(Debug, Clone)]
pub enum AnalyzerScript {
  /// Return these diagnostics after an optional delay.
  Return {
    diagnostics: Vec<Diagnostic>,
    delay: Duration,
  },
  /// Never return; ignores cancellation to exercise the engine's timeout.
  Hang,
  /// Fail with an analyzer defect.
  Fail(String),
}

impl AnalyzerScript {
  pub fn diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
    Self::Return {
      diagnostics,
      delay: Duration::ZERO,
    }
  }

  pub fn delayed(diagnostics: Vec<Diagnostic>, delay: Duration) -> Self {
    Self::Return { diagnostics, delay }
  }
}

/// Analyzer stub with per-document scripts and a call log.
///
/// Unscripted documents get a single default warning immediately.
pub struct StubAnalyzer {
  scripts: Mutex<HashMap<DocumentId, AnalyzerScript>>,
  calls: Mutex<Vec<DocumentId>>,
}

impl StubAnalyzer {
  pub fn new() -> Arc<Self> {
    Arc::new(Self {
      scripts: Mutex::new(HashMap::new()),
      calls: Mutex::new(Vec::new()),
    })
  }

  pub fn set(&self, document: DocumentId, script: AnalyzerScript) {
    self.scripts.lock().expect("scripts lock").insert(document, script);
  }

  pub fn calls(&self) -> Vec<DocumentId> {
    self.calls.lock().expect("calls lock").clone()
  }
}

#[async_trait]
impl AnalyzerEngine for StubAnalyzer {
  async fn analyze(
    &self,
    document: &ResolvedDocument,
    cancel: CancellationToken,
  ) -> Result<Vec<Diagnostic>, AnalyzeError> {
    self.calls.lock().expect("calls lock").push(document.id);

    let script = self
      .scripts
      .lock()
      .expect("scripts lock")
      .get(&document.id)
      .cloned()
      .unwrap_or_else(|| AnalyzerScript::diagnostics(vec![warning("default finding")]));

    match script {
      AnalyzerScript::Return { diagnostics, delay } => {
        if !delay.is_zero() {
          tokio::select! {
            _ = cancel.cancelled() => return Err(AnalyzeError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
          }
        }
        Ok(diagnostics)
      }
      AnalyzerScript::Hang => std::future::pending::<Result<Vec<Diagnostic>, AnalyzeError>>().await,
      AnalyzerScript::Fail(message) => Err(AnalyzeError::Failed(message)),
    }
  }
}

// ============================================================================
// In-memory Workspace
// ============================================================================

#[derive(Debug, Default)]
struct WorkspaceState {
  documents: HashMap<DocumentId, ResolvedDocument>,
  paths: HashMap<PathBuf, DocumentId>,
  projects: HashMap<ProjectId, (String, Vec<DocumentId>)>,
}

/// Mutable in-memory workspace; already initialized from the start.
#[derive(Debug, Default)]
pub struct TestWorkspace {
  state: Mutex<WorkspaceState>,
}

impl TestWorkspace {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn add_project(&self, name: &str) -> ProjectId {
    let project = ProjectId::from_key(name);
    let mut state = self.state.lock().expect("workspace lock");
    state.projects.insert(project, (name.to_string(), Vec::new()));
    project
  }

  pub fn add_document(&self, project: ProjectId, path: &str) -> DocumentId {
    let document = DocumentId::from_key(path);
    let mut state = self.state.lock().expect("workspace lock");
    let (project_name, documents) = state
      .projects
      .get_mut(&project)
      .expect("project must be added before its documents");
    let project_name = project_name.clone();
    documents.push(document);
    state.paths.insert(PathBuf::from(path), document);
    state.documents.insert(
      document,
      ResolvedDocument {
        id: document,
        path: PathBuf::from(path),
        project,
        project_name,
      },
    );
    document
  }

  pub fn remove_document(&self, document: &DocumentId) {
    let mut state = self.state.lock().expect("workspace lock");
    if let Some(resolved) = state.documents.remove(document) {
      state.paths.remove(&resolved.path);
      if let Some((_, documents)) = state.projects.get_mut(&resolved.project) {
        documents.retain(|d| d != document);
      }
    }
  }
}

#[async_trait]
impl Workspace for TestWorkspace {
  fn resolve_document(&self, id: &DocumentId) -> Option<ResolvedDocument> {
    self.state.lock().expect("workspace lock").documents.get(id).cloned()
  }

  fn resolve_path(&self, path: &Path) -> Option<DocumentId> {
    self.state.lock().expect("workspace lock").paths.get(path).copied()
  }

  fn document_project(&self, id: &DocumentId) -> Option<ProjectId> {
    self
      .state
      .lock()
      .expect("workspace lock")
      .documents
      .get(id)
      .map(|d| d.project)
  }

  fn project_documents(&self, project: &ProjectId) -> Vec<DocumentId> {
    self
      .state
      .lock()
      .expect("workspace lock")
      .projects
      .get(project)
      .map(|(_, documents)| documents.clone())
      .unwrap_or_default()
  }

  fn all_documents(&self) -> Vec<DocumentId> {
    self.state.lock().expect("workspace lock").documents.keys().copied().collect()
  }

  fn all_projects(&self) -> Vec<ProjectId> {
    self.state.lock().expect("workspace lock").projects.keys().copied().collect()
  }

  async fn wait_initialized(&self) {}
}

// ============================================================================
// Recording Sinks
// ============================================================================

#[derive(Debug, Default)]
pub struct RecordingProgress {
  reports: Mutex<Vec<(BackgroundStatus, usize, usize, usize)>>,
}

impl RecordingProgress {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn reports(&self) -> Vec<(BackgroundStatus, usize, usize, usize)> {
    self.reports.lock().expect("reports lock").clone()
  }

  pub fn count(&self, status: BackgroundStatus) -> usize {
    self.reports().iter().filter(|(s, _, _, _)| *s == status).count()
  }
}

impl ProgressSink for RecordingProgress {
  fn report(&self, status: BackgroundStatus, project_count: usize, document_count: usize, remaining: usize) {
    self
      .reports
      .lock()
      .expect("reports lock")
      .push((status, project_count, document_count, remaining));
  }
}

#[derive(Debug, Default)]
pub struct RecordingPublisher {
  published: Mutex<Vec<(PathBuf, Vec<Diagnostic>)>>,
}

impl RecordingPublisher {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn published(&self) -> Vec<(PathBuf, Vec<Diagnostic>)> {
    self.published.lock().expect("published lock").clone()
  }
}

#[async_trait]
impl DiagnosticsSink for RecordingPublisher {
  async fn publish(&self, path: &Path, diagnostics: &[Diagnostic]) {
    self
      .published
      .lock()
      .expect("published lock")
      .push((path.to_path_buf(), diagnostics.to_vec()));
  }
}

// ============================================================================
// Engine Context
// ============================================================================

pub struct TestContext {
  pub workspace: Arc<TestWorkspace>,
  pub analyzer: Arc<StubAnalyzer>,
  pub progress: Arc<RecordingProgress>,
  pub publisher: Arc<RecordingPublisher>,
  pub engine: DiagnosticsEngine,
}

impl TestContext {
  pub fn start(workers: usize, analysis_timeout_ms: u64) -> Self {
    Self::start_with(EngineConfig {
      workers,
      analysis_timeout_ms,
      ..EngineConfig::default()
    })
  }

  pub fn start_with(config: EngineConfig) -> Self {
    let workspace = TestWorkspace::new();
    let analyzer = StubAnalyzer::new();
    let progress = RecordingProgress::new();
    let publisher = RecordingPublisher::new();

    let engine = DiagnosticsEngine::start(
      config,
      workspace.clone(),
      analyzer.clone(),
      progress.clone(),
      publisher.clone(),
    );

    Self {
      workspace,
      analyzer,
      progress,
      publisher,
      engine,
    }
  }

  /// Poll the cache until the document has a snapshot.
  pub async fn wait_for_snapshot(&self, document: &DocumentId) -> DiagnosticSnapshot {
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
      if let Some(snapshot) = self.engine.cache().get(document) {
        return snapshot;
      }
      assert!(Instant::now() < deadline, "timed out waiting for snapshot of {document}");
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
  }
}

/// Poll until a condition holds, panicking after a few seconds.
pub async fn wait_until<F: Fn() -> bool>(what: &str, condition: F) {
  let deadline = Instant::now() + Duration::from_secs(3);
  while Instant::now() < deadline {
    if condition() {
      return;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  panic!("timed out waiting for {what}");
}
