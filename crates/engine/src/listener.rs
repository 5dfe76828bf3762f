//! Change listener: workspace lifecycle events → scheduling actions.
//!
//! Document-level events are latency-sensitive and schedule Foreground
//! work for that one document; structural events (project/solution
//! load, analyzer-config change) schedule Background sweeps of the
//! affected scope. Document removal clears the cache instead of
//! scheduling anything.
//!
//! The listener has an explicit lifecycle: [`spawn`] starts it,
//! [`stop`] cancels its token and joins the task deterministically —
//! nothing is tied to drop order.
//!
//! [`spawn`]: ChangeListener::spawn
//! [`stop`]: ChangeListener::stop

use std::sync::Arc;

use beacon_core::{DocumentId, ProjectId, WorkClass};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
  cache::DiagnosticsCache,
  queue::WorkQueue,
  workspace::{Workspace, WorkspaceEvent},
};

/// Handle to a running change listener.
pub struct ChangeListener {
  cancel: CancellationToken,
  handle: tokio::task::JoinHandle<()>,
}

impl ChangeListener {
  /// Spawn the listener task. It waits for the workspace's
  /// initialization-complete signal before consuming events.
  pub fn spawn(
    queue: Arc<WorkQueue>,
    cache: Arc<DiagnosticsCache>,
    workspace: Arc<dyn Workspace>,
    events: mpsc::Receiver<WorkspaceEvent>,
    cancel: CancellationToken,
  ) -> Self {
    let task = ListenerTask {
      queue,
      cache,
      workspace,
      events,
      cancel: cancel.clone(),
    };
    let handle = tokio::spawn(task.run());
    Self { cancel, handle }
  }

  /// Stop consuming events and join the task.
  pub async fn stop(self) {
    self.cancel.cancel();
    if let Err(e) = self.handle.await {
      warn!(error = %e, "Change listener task did not join cleanly");
    }
  }
}

struct ListenerTask {
  queue: Arc<WorkQueue>,
  cache: Arc<DiagnosticsCache>,
  workspace: Arc<dyn Workspace>,
  events: mpsc::Receiver<WorkspaceEvent>,
  cancel: CancellationToken,
}

impl ListenerTask {
  async fn run(mut self) {
    // Don't schedule against a half-loaded workspace
    tokio::select! {
      biased;
      _ = self.cancel.cancelled() => {
        info!("Change listener shutting down (cancelled before workspace init)");
        return;
      }
      _ = self.workspace.wait_initialized() => {}
    }

    info!("Change listener started");

    loop {
      tokio::select! {
        biased;

        _ = self.cancel.cancelled() => {
          info!("Change listener shutting down (cancelled)");
          break;
        }

        event = self.events.recv() => {
          match event {
            Some(event) => self.handle_event(event),
            None => {
              info!("Change listener shutting down (event channel closed)");
              break;
            }
          }
        }
      }
    }

    info!("Change listener stopped");
  }

  fn handle_event(&self, event: WorkspaceEvent) {
    trace!(event = ?event, "Workspace event");

    match event {
      WorkspaceEvent::DocumentAdded(document)
      | WorkspaceEvent::DocumentChanged(document)
      | WorkspaceEvent::DocumentReloaded(document)
      | WorkspaceEvent::DocumentInfoChanged(document) => {
        self
          .queue
          .put_work(&[document], WorkClass::Foreground, 1, &self.cancel.child_token());
      }

      WorkspaceEvent::DocumentRemoved(document) => {
        if self.cache.remove(&document) {
          debug!(document = %document, "Evicted snapshot for removed document");
        } else {
          debug!(document = %document, "Removed document had no cached snapshot");
        }
      }

      WorkspaceEvent::AnalyzerConfigChanged(document) => {
        // A config edit invalidates analysis of its whole project
        match self.workspace.document_project(&document) {
          Some(project) => self.sweep_projects(&[project]),
          None => debug!(document = %document, "Analyzer config document has no owning project"),
        }
      }

      WorkspaceEvent::ProjectAdded(project)
      | WorkspaceEvent::ProjectChanged(project)
      | WorkspaceEvent::ProjectReloaded(project) => {
        self.sweep_projects(&[project]);
      }

      WorkspaceEvent::SolutionAdded | WorkspaceEvent::SolutionChanged | WorkspaceEvent::SolutionReloaded => {
        self.sweep_all();
      }
    }
  }

  fn sweep_projects(&self, projects: &[ProjectId]) {
    let documents: Vec<DocumentId> = projects
      .iter()
      .flat_map(|project| self.workspace.project_documents(project))
      .collect();
    if documents.is_empty() {
      return;
    }
    debug!(documents = documents.len(), projects = projects.len(), "Scheduling project sweep");
    self
      .queue
      .put_work(&documents, WorkClass::Background, projects.len(), &self.cancel.child_token());
  }

  fn sweep_all(&self) {
    let documents = self.workspace.all_documents();
    let project_count = self.workspace.all_projects().len();
    if documents.is_empty() {
      return;
    }
    debug!(documents = documents.len(), projects = project_count, "Scheduling solution sweep");
    self
      .queue
      .put_work(&documents, WorkClass::Background, project_count, &self.cancel.child_token());
  }
}
