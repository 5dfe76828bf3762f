//! Shared types and configuration for the beacon diagnostics engine.
//!
//! This crate holds everything both the engine and its hosts need to
//! agree on: document/project identity, diagnostic records and
//! snapshots, and the engine configuration with its TOML loader.

pub mod config;
pub mod types;

pub use config::EngineConfig;
pub use types::{
  Diagnostic, DiagnosticSeverity, DiagnosticSnapshot, DocumentId, ProjectId, Span, WorkClass,
};
