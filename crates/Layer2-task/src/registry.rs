//! Task Registry - concurrency-safe mapping from handle to record
//!
//! Structural changes (insert/remove) take the map's write lock. Everything
//! else takes the read lock just long enough to clone the record's `Arc`, and
//! then works against the record's own lock. Publishing a terminal state
//! therefore never waits on the map and never races a reader of that record.

use crate::handle::{HandleAllocator, TaskHandle};
use crate::state::{Outcome, TaskResult, TaskState, TaskStatus};
use crate::task::{TaskRecord, TaskSnapshot};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use taskbridge_foundation::{Error, Result};
use tracing::{debug, warn};

/// What `complete` did with an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The record moved to its terminal state
    Published,

    /// The handle was cleaned up first; the outcome was dropped
    Discarded,
}

/// Aggregate counts over the live records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub pending: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl std::fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Total: {}, Pending: {}, Completed: {}, Failed: {}",
            self.total, self.pending, self.succeeded, self.failed
        )
    }
}

/// Registry of task records
#[derive(Debug, Default)]
pub struct TaskRegistry {
    allocator: HandleAllocator,
    records: RwLock<HashMap<TaskHandle, Arc<TaskRecord>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            allocator: HandleAllocator::new(),
            // Pre-allocate for typical concurrent task count
            records: RwLock::new(HashMap::with_capacity(16)),
        }
    }

    /// Issue a fresh handle from this registry's allocator
    pub fn next_handle(&self) -> Result<TaskHandle> {
        self.allocator.next()
    }

    fn get(&self, handle: TaskHandle) -> Option<Arc<TaskRecord>> {
        self.records.read().get(&handle).cloned()
    }

    /// Insert a Pending record. Never overwrites a live record.
    pub fn register(&self, handle: TaskHandle, label: impl Into<String>) -> Result<()> {
        let mut records = self.records.write();
        if records.contains_key(&handle) {
            return Err(Error::DuplicateHandle(handle.get()));
        }
        let record = TaskRecord::new(handle, label);
        debug!("Registered task {} ({})", handle, record.label());
        records.insert(handle, Arc::new(record));
        Ok(())
    }

    pub fn status(&self, handle: TaskHandle) -> TaskStatus {
        self.get(handle)
            .map(|record| record.status())
            .unwrap_or(TaskStatus::NotFound)
    }

    /// Move a Pending record to its terminal state.
    ///
    /// A cleaned-up handle is `Discarded`, not resurrected. Completing twice
    /// is an invariant violation reported as `Error::AlreadyCompleted`.
    pub fn complete(&self, handle: TaskHandle, outcome: Outcome) -> Result<Completion> {
        let Some(record) = self.get(handle) else {
            warn!("Discarding outcome of task {}: handle was cleaned up", handle);
            return Ok(Completion::Discarded);
        };

        let success = outcome.is_success();
        record.finish(outcome)?;
        debug!(
            "Task {} finished: {}",
            handle,
            if success { "completed" } else { "failed" }
        );
        Ok(Completion::Published)
    }

    pub fn result(&self, handle: TaskHandle) -> TaskResult {
        self.get(handle)
            .map(|record| record.result())
            .unwrap_or(TaskResult::NotFound)
    }

    pub fn snapshot(&self, handle: TaskHandle) -> Option<TaskSnapshot> {
        self.get(handle).map(|record| record.snapshot())
    }

    /// Drop a record. Returns whether one was present.
    pub fn remove(&self, handle: TaskHandle) -> bool {
        let removed = self.records.write().remove(&handle).is_some();
        if removed {
            debug!("Removed task {}", handle);
        }
        removed
    }

    /// Best-effort point-in-time counts
    pub fn stats(&self) -> RegistryStats {
        let records = self.records.read();
        let mut stats = RegistryStats::default();

        for record in records.values() {
            record.inspect(|state| match state {
                TaskState::Pending => stats.pending += 1,
                TaskState::Completed(_) => stats.succeeded += 1,
                TaskState::Failed(_) => stats.failed += 1,
            });
            stats.total += 1;
        }

        stats
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
