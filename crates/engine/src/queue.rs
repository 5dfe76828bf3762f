//! Two-priority work queue keyed by document identity.
//!
//! The queue is the engine's scheduling heart. It guarantees:
//!
//! - Foreground items are always dequeued before any Background item;
//!   within a class, FIFO by enqueue order.
//! - At most one *pending* item per document: re-enqueuing a pending
//!   document supersedes the existing item (last enqueue wins for class
//!   and cancellation token; every superseded batch keeps decrementing
//!   off the single surviving item).
//! - At most one *in-flight* analysis per document: an eligible item
//!   whose document is currently executing is deferred until that
//!   execution acknowledges.
//! - In-place promotion: a pending Background item becomes Foreground
//!   without duplication.
//! - A foreground-drained barrier for interactive callers.
//!
//! Queue state lives behind a single std `Mutex` (critical sections are
//! short and never suspend). Parked takers are woken through a `Notify`
//! using the enable-then-check pattern, and the barrier is a `watch`
//! channel carrying the count of outstanding Foreground items.

use std::{
  collections::{HashMap, VecDeque},
  sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use beacon_core::{DocumentId, WorkClass};
use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;
use tracing::trace;

// ============================================================================
// Batch Descriptor
// ============================================================================

/// Drain counters for a group of items enqueued together.
///
/// Shared across the batch's items and used only to drive progress
/// reporting; correctness never depends on it.
#[derive(Debug)]
pub struct Batch {
  pub class: WorkClass,
  pub document_count: usize,
  pub project_count: usize,
  remaining: AtomicUsize,
  started: AtomicBool,
}

impl Batch {
  fn new(class: WorkClass, document_count: usize, project_count: usize) -> Self {
    Self {
      class,
      document_count,
      project_count,
      remaining: AtomicUsize::new(document_count),
      started: AtomicBool::new(false),
    }
  }

  /// Items of this batch not yet acknowledged.
  pub fn remaining(&self) -> usize {
    self.remaining.load(Ordering::SeqCst)
  }

  /// Mark the batch's first dequeue; returns true exactly once.
  pub(crate) fn mark_started(&self) -> bool {
    !self.started.swap(true, Ordering::SeqCst)
  }

  /// Decrement `remaining`, returning the new value. Saturates at zero
  /// so supersede bookkeeping can never underflow.
  fn acknowledge(&self) -> usize {
    let mut current = self.remaining.load(Ordering::SeqCst);
    loop {
      if current == 0 {
        return 0;
      }
      match self
        .remaining
        .compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst)
      {
        Ok(_) => return current - 1,
        Err(observed) => current = observed,
      }
    }
  }
}

// ============================================================================
// Work Item
// ============================================================================

/// A dequeued unit of "analyze this document".
///
/// `batches` holds every batch descriptor this item must acknowledge:
/// its own enqueue's batch last, preceded by the batches of any enqueues
/// it superseded while pending.
#[derive(Debug)]
pub struct WorkItem {
  pub document: DocumentId,
  pub class: WorkClass,
  pub token: CancellationToken,
  pub batches: Vec<Arc<Batch>>,
}

// ============================================================================
// Queue State
// ============================================================================

#[derive(Debug)]
struct Pending {
  /// Stamp of this item's live entry in its class deque; older entries
  /// for the same document are skipped as stale at dequeue time.
  seq: u64,
  class: WorkClass,
  token: CancellationToken,
  batches: Vec<Arc<Batch>>,
}

#[derive(Debug, Default)]
struct QueueState {
  pending: HashMap<DocumentId, Pending>,
  foreground: VecDeque<(DocumentId, u64)>,
  background: VecDeque<(DocumentId, u64)>,
  /// Documents currently executing, with the class they were dequeued at.
  in_flight: HashMap<DocumentId, WorkClass>,
  /// Foreground items pending or in-flight (mirrored into the barrier).
  foreground_outstanding: usize,
  next_seq: u64,
}

impl QueueState {
  fn stamp(&mut self) -> u64 {
    let seq = self.next_seq;
    self.next_seq += 1;
    seq
  }

  fn deque_mut(&mut self, class: WorkClass) -> &mut VecDeque<(DocumentId, u64)> {
    match class {
      WorkClass::Foreground => &mut self.foreground,
      WorkClass::Background => &mut self.background,
    }
  }
}

// ============================================================================
// Work Queue
// ============================================================================

/// Thread-safe two-priority-class queue of analysis work items.
pub struct WorkQueue {
  state: Mutex<QueueState>,
  takers: Notify,
  fg_barrier: watch::Sender<usize>,
}

impl Default for WorkQueue {
  fn default() -> Self {
    Self::new()
  }
}

impl WorkQueue {
  pub fn new() -> Self {
    let (fg_barrier, _) = watch::channel(0);
    Self {
      state: Mutex::new(QueueState::default()),
      takers: Notify::new(),
      fg_barrier,
    }
  }

  fn locked(&self) -> MutexGuard<'_, QueueState> {
    // A poisoned lock means a panic inside a (non-suspending) critical
    // section; queue state cannot be trusted past that point.
    self.state.lock().expect("work queue state poisoned")
  }

  /// Enqueue one item per document, all sharing a fresh batch descriptor.
  ///
  /// Never blocks. Documents with an item already pending are superseded
  /// in place: the new class and token win, the old queue position is
  /// kept when the class is unchanged, and the old enqueue's batch stays
  /// attached so its counters still decrement when the single surviving
  /// item completes.
  pub fn put_work(
    &self,
    documents: &[DocumentId],
    class: WorkClass,
    project_count: usize,
    token: &CancellationToken,
  ) -> Arc<Batch> {
    let batch = Arc::new(Batch::new(class, documents.len(), project_count));

    {
      let mut state = self.locked();
      for &document in documents {
        let seq = state.stamp();
        let reclassed = match state.pending.get_mut(&document) {
          Some(pending) => {
            pending.batches.push(batch.clone());
            pending.token = token.clone();
            if pending.class == class {
              // Same class: the existing queue position survives
              continue;
            }
            // Re-classed: move the live entry to the other deque. The
            // stale entry is skipped by its seq at dequeue time.
            pending.class = class;
            pending.seq = seq;
            true
          }
          None => {
            state.pending.insert(
              document,
              Pending {
                seq,
                class,
                token: token.clone(),
                batches: vec![batch.clone()],
              },
            );
            false
          }
        };

        state.deque_mut(class).push_back((document, seq));
        match class {
          WorkClass::Foreground => state.foreground_outstanding += 1,
          WorkClass::Background if reclassed => {
            state.foreground_outstanding = state.foreground_outstanding.saturating_sub(1);
          }
          WorkClass::Background => {}
        }
      }
      self.fg_barrier.send_replace(state.foreground_outstanding);
    }

    trace!(
      documents = documents.len(),
      class = ?class,
      "Work enqueued"
    );
    self.takers.notify_waiters();
    batch
  }

  /// Promote a pending Background item to Foreground in place.
  ///
  /// No-op when the document has no pending item or is already
  /// Foreground. Never blocks and never duplicates work.
  pub fn try_promote(&self, document: &DocumentId) {
    let promoted = {
      let mut state = self.locked();
      let eligible = matches!(
        state.pending.get(document),
        Some(pending) if pending.class == WorkClass::Background
      );
      if eligible {
        let seq = state.stamp();
        if let Some(pending) = state.pending.get_mut(document) {
          pending.class = WorkClass::Foreground;
          pending.seq = seq;
        }
        state.foreground.push_back((*document, seq));
        state.foreground_outstanding += 1;
        self.fg_barrier.send_replace(state.foreground_outstanding);
      }
      eligible
    };

    if promoted {
      trace!(document = %document, "Promoted to foreground");
      self.takers.notify_waiters();
    }
  }

  /// Dequeue the next item, suspending while none is eligible.
  ///
  /// All currently-pending Foreground items are returned strictly before
  /// any Background item; within a class, FIFO by enqueue order. An item
  /// whose document is currently in-flight stays pending until that
  /// execution acknowledges.
  pub async fn take(&self) -> WorkItem {
    loop {
      let notified = self.takers.notified();
      tokio::pin!(notified);
      // Register before checking so a wakeup between the check and the
      // await is never lost.
      notified.as_mut().enable();

      if let Some(item) = self.try_take() {
        return item;
      }
      notified.await;
    }
  }

  fn try_take(&self) -> Option<WorkItem> {
    let mut state = self.locked();
    Self::pop_class(&mut state, WorkClass::Foreground).or_else(|| Self::pop_class(&mut state, WorkClass::Background))
  }

  fn pop_class(state: &mut QueueState, class: WorkClass) -> Option<WorkItem> {
    let QueueState {
      pending,
      foreground,
      background,
      in_flight,
      ..
    } = state;
    let deque = match class {
      WorkClass::Foreground => foreground,
      WorkClass::Background => background,
    };

    let mut deferred: Vec<(DocumentId, u64)> = Vec::new();
    let mut taken = None;

    while let Some((document, seq)) = deque.pop_front() {
      match pending.get(&document) {
        // Stale: item already taken, or superseded into another position
        None => continue,
        Some(p) if p.seq != seq || p.class != class => continue,
        // One-in-flight-per-document: defer until the running analysis
        // of this document acknowledges
        Some(_) if in_flight.contains_key(&document) => {
          deferred.push((document, seq));
          continue;
        }
        Some(_) => {}
      }

      let Some(p) = pending.remove(&document) else { continue };
      in_flight.insert(document, p.class);
      taken = Some(WorkItem {
        document,
        class: p.class,
        token: p.token,
        batches: p.batches,
      });
      break;
    }

    // Deferred entries keep their position at the head of the class
    for entry in deferred.into_iter().rev() {
      deque.push_front(entry);
    }

    taken
  }

  /// Acknowledge a finished item (analysis attempted, any outcome).
  ///
  /// Decrements every batch counter the item carries and returns the
  /// batches with their post-decrement remaining counts so the caller
  /// can report progress. Clears the document's in-flight mark, making
  /// it eligible for a deferred or future pending item.
  pub fn work_complete(&self, item: &WorkItem) -> Vec<(Arc<Batch>, usize)> {
    let completions: Vec<(Arc<Batch>, usize)> = item
      .batches
      .iter()
      .map(|batch| (batch.clone(), batch.acknowledge()))
      .collect();

    {
      let mut state = self.locked();
      state.in_flight.remove(&item.document);
      if item.class == WorkClass::Foreground {
        state.foreground_outstanding = state.foreground_outstanding.saturating_sub(1);
      }
      self.fg_barrier.send_replace(state.foreground_outstanding);
    }

    // A deferred item for this document may now be eligible
    self.takers.notify_waiters();
    completions
  }

  /// Suspend until no Foreground item remains pending or in-flight, or
  /// until `token` fires. A fired token returns normally — it means
  /// "give up waiting", not failure.
  pub async fn wait_foreground_complete(&self, token: &CancellationToken) {
    let mut barrier = self.fg_barrier.subscribe();
    loop {
      if *barrier.borrow_and_update() == 0 {
        return;
      }
      tokio::select! {
        _ = token.cancelled() => return,
        changed = barrier.changed() => {
          if changed.is_err() {
            return;
          }
        }
      }
    }
  }

  /// Number of pending (not yet dequeued) items.
  pub fn pending_len(&self) -> usize {
    self.locked().pending.len()
  }
}

// ============================================================================
// Tests
// ============================================================================
