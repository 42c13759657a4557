//! Task state machine and the views polling callers get of it

use serde::{Deserialize, Serialize};

/// Prefix shared by every sentinel result text
pub const ERROR_PREFIX: &str = "Error: ";

/// Result text for an unknown or cleaned-up handle
pub const NOT_FOUND_TEXT: &str = "Error: task not found";

/// Result text for a task that has not finished yet
pub const STILL_RUNNING_TEXT: &str = "Error: task still running";

/// Possible states of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Task is still running
    Pending,

    /// Task completed successfully with its output
    Completed(String),

    /// Task failed with a diagnostic
    Failed(String),
}

impl TaskState {
    /// Check if this is a terminal state (cannot transition further)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Pending)
    }

    /// Check if task completed successfully
    pub fn is_success(&self) -> bool {
        matches!(self, TaskState::Completed(_))
    }

    /// Get display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            TaskState::Pending => "Pending",
            TaskState::Completed(_) => "Completed",
            TaskState::Failed(_) => "Failed",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// What a unit of work produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Failure(String),
}

impl Outcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self::Success(output.into())
    }

    pub fn failure(diagnostic: impl Into<String>) -> Self {
        Self::Failure(diagnostic.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

impl From<Outcome> for TaskState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success(output) => TaskState::Completed(output),
            Outcome::Failure(diagnostic) => TaskState::Failed(diagnostic),
        }
    }
}

/// Tri-state answer to a status check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    NotFound,
    Pending,
    /// Completed or Failed
    Done,
}

impl TaskStatus {
    /// Boundary code: -1 not found, 0 pending, 1 done
    pub fn code(self) -> i32 {
        match self {
            TaskStatus::NotFound => -1,
            TaskStatus::Pending => 0,
            TaskStatus::Done => 1,
        }
    }
}

/// Terminal content of a task as seen by a reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    NotFound,
    StillRunning,
    Completed(String),
    Failed(String),
}

impl TaskResult {
    /// Legacy text form: the output on success, an `Error: ` sentinel otherwise
    pub fn into_text(self) -> String {
        match self {
            TaskResult::NotFound => NOT_FOUND_TEXT.to_string(),
            TaskResult::StillRunning => STILL_RUNNING_TEXT.to_string(),
            TaskResult::Completed(output) => output,
            TaskResult::Failed(diagnostic) => format!("{}{}", ERROR_PREFIX, diagnostic),
        }
    }
}

/// Result of waiting on a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Done,
    NotFound,
    TimedOut,
}

impl WaitOutcome {
    /// Boundary code: 1 done, -1 not found, -2 timed out
    pub fn code(self) -> i32 {
        match self {
            WaitOutcome::Done => 1,
            WaitOutcome::NotFound => -1,
            WaitOutcome::TimedOut => -2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!TaskState::Pending.is_terminal());
        assert!(TaskState::Completed("ok".into()).is_terminal());
        assert!(TaskState::Failed("bad".into()).is_terminal());
        assert!(!TaskState::Failed("bad".into()).is_success());
    }

    #[test]
    fn test_outcome_into_state() {
        assert_eq!(
            TaskState::from(Outcome::success("out")),
            TaskState::Completed("out".into())
        );
        assert_eq!(
            TaskState::from(Outcome::failure("diag")),
            TaskState::Failed("diag".into())
        );
    }

    #[test]
    fn test_sentinel_text() {
        assert_eq!(TaskResult::NotFound.into_text(), "Error: task not found");
        assert_eq!(TaskResult::StillRunning.into_text(), "Error: task still running");
        assert_eq!(
            TaskResult::Failed("exit status: 1".into()).into_text(),
            "Error: exit status: 1"
        );
        assert_eq!(TaskResult::Completed("hello".into()).into_text(), "hello");
    }

    #[test]
    fn test_boundary_codes() {
        assert_eq!(TaskStatus::NotFound.code(), -1);
        assert_eq!(TaskStatus::Pending.code(), 0);
        assert_eq!(TaskStatus::Done.code(), 1);
        assert_eq!(WaitOutcome::Done.code(), 1);
        assert_eq!(WaitOutcome::NotFound.code(), -1);
        assert_eq!(WaitOutcome::TimedOut.code(), -2);
    }
}
