//! Task record - the per-task state cell

use crate::handle::TaskHandle;
use crate::state::{Outcome, TaskResult, TaskState, TaskStatus};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use taskbridge_foundation::{Error, Result};

/// State plus the moment it became terminal, guarded together so a reader
/// never sees one without the other.
#[derive(Debug)]
struct RecordState {
    state: TaskState,
    finished_at: Option<DateTime<Utc>>,
}

/// One submitted task
#[derive(Debug)]
pub struct TaskRecord {
    handle: TaskHandle,

    /// Short description of the job
    label: String,

    /// When the task was registered
    created_at: DateTime<Utc>,

    inner: Mutex<RecordState>,
}

impl TaskRecord {
    /// Create a new Pending record
    pub fn new(handle: TaskHandle, label: impl Into<String>) -> Self {
        Self {
            handle,
            label: label.into(),
            created_at: Utc::now(),
            inner: Mutex::new(RecordState {
                state: TaskState::Pending,
                finished_at: None,
            }),
        }
    }

    pub fn handle(&self) -> TaskHandle {
        self.handle
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Publish the terminal state. Write-once: a second call is rejected.
    pub fn finish(&self, outcome: Outcome) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            return Err(Error::AlreadyCompleted(self.handle.get()));
        }
        inner.state = outcome.into();
        inner.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Current state (cloned)
    pub fn state(&self) -> TaskState {
        self.inner.lock().state.clone()
    }

    /// Look at the state under the record lock without cloning its payload
    pub fn inspect<R>(&self, f: impl FnOnce(&TaskState) -> R) -> R {
        f(&self.inner.lock().state)
    }

    pub fn status(&self) -> TaskStatus {
        if self.inner.lock().state.is_terminal() {
            TaskStatus::Done
        } else {
            TaskStatus::Pending
        }
    }

    pub fn result(&self) -> TaskResult {
        match &self.inner.lock().state {
            TaskState::Pending => TaskResult::StillRunning,
            TaskState::Completed(output) => TaskResult::Completed(output.clone()),
            TaskState::Failed(diagnostic) => TaskResult::Failed(diagnostic.clone()),
        }
    }

    /// Serializable view for inspection
    pub fn snapshot(&self) -> TaskSnapshot {
        let inner = self.inner.lock();
        let end = inner.finished_at.unwrap_or_else(Utc::now);
        TaskSnapshot {
            handle: self.handle,
            label: self.label.clone(),
            state: inner.state.display_name(),
            created_at: self.created_at,
            finished_at: inner.finished_at,
            elapsed_ms: (end - self.created_at).num_milliseconds().max(0) as u64,
        }
    }
}

/// Point-in-time description of a task
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub handle: TaskHandle,
    pub label: String,
    pub state: &'static str,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_ms: u64,
}
