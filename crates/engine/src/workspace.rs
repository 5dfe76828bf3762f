//! Workspace boundary.
//!
//! The engine never owns the document/project model; it consumes a
//! snapshot-oriented view of it. Resolution happens against the current
//! snapshot at the moment of the call, so a document can stop resolving
//! between being scheduled and being analyzed — workers treat that as a
//! silent skip.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use beacon_core::{DocumentId, ProjectId};

/// A document resolved against the current workspace snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDocument {
  pub id: DocumentId,
  pub path: PathBuf,
  pub project: ProjectId,
  pub project_name: String,
}

/// Lifecycle notifications emitted by the workspace.
///
/// Consumed by the [`ChangeListener`](crate::listener::ChangeListener),
/// which turns them into scheduling actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceEvent {
  DocumentAdded(DocumentId),
  DocumentChanged(DocumentId),
  DocumentReloaded(DocumentId),
  /// Document metadata changed (name, folder, ...) without an edit.
  DocumentInfoChanged(DocumentId),
  DocumentRemoved(DocumentId),
  /// An analyzer-config document of some project changed; identified by
  /// the config document itself, whose owning project gets re-swept.
  AnalyzerConfigChanged(DocumentId),
  ProjectAdded(ProjectId),
  ProjectChanged(ProjectId),
  ProjectReloaded(ProjectId),
  SolutionAdded,
  SolutionChanged,
  SolutionReloaded,
}

/// Read-only view of the host's document/project/solution model.
///
/// All snapshot queries are synchronous; only the initial-load signal can
/// suspend. Implementations must be safe to call concurrently from every
/// worker plus the listener and query APIs.
#[async_trait]
pub trait Workspace: Send + Sync {
  /// Resolve a document id against the current snapshot.
  fn resolve_document(&self, id: &DocumentId) -> Option<ResolvedDocument>;

  /// Resolve a filesystem path to a document id.
  fn resolve_path(&self, path: &Path) -> Option<DocumentId>;

  /// Owning project of a document, if the document still exists.
  fn document_project(&self, id: &DocumentId) -> Option<ProjectId>;

  /// All document ids belonging to one project.
  fn project_documents(&self, project: &ProjectId) -> Vec<DocumentId>;

  /// All document ids currently known to the workspace.
  fn all_documents(&self) -> Vec<DocumentId>;

  /// All project ids currently known to the workspace.
  fn all_projects(&self) -> Vec<ProjectId>;

  /// Completes once the workspace has finished its initial load.
  async fn wait_initialized(&self);
}
