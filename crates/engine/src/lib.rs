//! Background diagnostics engine.
//!
//! Continuously re-analyzes a mutating collection of source documents,
//! serving both "fresh results for these documents now" and "sweep
//! everything in the background" without ever blocking document edits on
//! analysis.
//!
//! # Architecture
//!
//! ```text
//! Change Listener → Work Queue → Worker Pool → Analyzer Engine
//!                                     │
//!                                     ├→ Result Cache → query APIs
//!                                     ├→ DiagnosticsSink (per-document pushes)
//!                                     └→ ProgressSink (batch status)
//! ```
//!
//! - [`WorkQueue`]: two-priority-class queue keyed by document identity,
//!   with in-place promotion and a foreground-drained barrier
//! - [`DiagnosticsEngine`]: owns the queue, cache, and worker pool;
//!   exposes the query APIs and the shutdown protocol
//! - [`ChangeListener`]: maps workspace lifecycle events to scheduling
//!   actions, with an explicit spawn/stop lifecycle
//!
//! The analysis computation itself, the document/project model, and the
//! delivery transport are external collaborators behind the
//! [`AnalyzerEngine`], [`Workspace`], [`ProgressSink`], and
//! [`DiagnosticsSink`] traits.

pub mod analyzer;
pub mod cache;
pub mod engine;
pub mod listener;
pub mod queue;
pub mod report;
pub mod workspace;

mod worker;


pub use analyzer::{AnalyzeError, AnalyzerEngine};
pub use cache::DiagnosticsCache;
pub use engine::DiagnosticsEngine;
pub use listener::ChangeListener;
pub use queue::{Batch, WorkItem, WorkQueue};
pub use report::{BackgroundStatus, DiagnosticsSink, ProgressSink};
pub use workspace::{ResolvedDocument, Workspace, WorkspaceEvent};
