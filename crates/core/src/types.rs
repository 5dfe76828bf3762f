//! Identity and diagnostic data types.
//!
//! Identities are opaque UUIDs: stable across edits, minted fresh when a
//! document or project enters the workspace, and invalid once it leaves.
//! Hosts that key documents by path can derive stable ids with the v5
//! constructors.

use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Identity
// ============================================================================

/// Stable identity of a single source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
  /// Mint a fresh random id.
  pub fn new() -> Self {
    Self(Uuid::new_v4())
  }

  /// Derive a stable id from a host-side key (e.g. an absolute path).
  pub fn from_key(key: &str) -> Self {
    Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()))
  }
}

impl fmt::Display for DocumentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt(f)
  }
}

/// Stable identity of a project (a group of documents sharing
/// compilation context).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(Uuid);

impl ProjectId {
  /// Mint a fresh random id.
  pub fn new() -> Self {
    Self(Uuid::new_v4())
  }

  /// Derive a stable id from a host-side key.
  pub fn from_key(key: &str) -> Self {
    Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()))
  }
}

impl fmt::Display for ProjectId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt(f)
  }
}

// ============================================================================
// Work Classification
// ============================================================================

/// Priority class of a scheduled analysis.
///
/// Foreground work is latency-sensitive (edits, interactive queries) and
/// is always dequeued before any Background work. Background work is the
/// best-effort bulk sweep triggered by structural changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkClass {
  Foreground,
  Background,
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Severity of a diagnostic, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
  Error,
  Warning,
  Info,
  Hint,
}

/// Source span a diagnostic applies to (zero-based, end-exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
  pub start_line: u32,
  pub start_col: u32,
  pub end_line: u32,
  pub end_col: u32,
}

/// A single analyzer finding.
///
/// The engine stores and delivers these without interpreting them; the
/// analyzer owns their meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
  pub severity: DiagnosticSeverity,
  pub span: Span,
  /// Analyzer-assigned rule code (e.g. "CS8602").
  pub code: String,
  pub message: String,
}

/// The latest diagnostic result for one document.
///
/// Exactly one snapshot exists per analyzed document and it is replaced
/// wholesale on every completed analysis; there is no partial merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticSnapshot {
  pub document: DocumentId,
  pub path: PathBuf,
  pub project: ProjectId,
  pub project_name: String,
  pub diagnostics: Vec<Diagnostic>,
}
