//! Result cache: the latest diagnostic snapshot per document.
//!
//! Written only by workers (and cleared on document removal); read by
//! the query APIs. Last writer wins per document, wholesale — there is
//! no partial merge of snapshots.

use beacon_core::{DiagnosticSnapshot, DocumentId};
use dashmap::DashMap;
use tracing::trace;

/// Concurrent map from document identity to its latest snapshot.
#[derive(Debug, Default)]
pub struct DiagnosticsCache {
  snapshots: DashMap<DocumentId, DiagnosticSnapshot>,
}

impl DiagnosticsCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store a snapshot, replacing any previous one for the document.
  pub fn insert(&self, snapshot: DiagnosticSnapshot) {
    trace!(
      document = %snapshot.document,
      diagnostics = snapshot.diagnostics.len(),
      "Cached diagnostic snapshot"
    );
    self.snapshots.insert(snapshot.document, snapshot);
  }

  /// Latest snapshot for a document, if it has ever been analyzed.
  pub fn get(&self, document: &DocumentId) -> Option<DiagnosticSnapshot> {
    self.snapshots.get(document).map(|entry| entry.clone())
  }

  /// Evict a removed document's snapshot. Returns false when there was
  /// nothing cached for it.
  pub fn remove(&self, document: &DocumentId) -> bool {
    self.snapshots.remove(document).is_some()
  }

  pub fn len(&self) -> usize {
    self.snapshots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.snapshots.is_empty()
  }
}
