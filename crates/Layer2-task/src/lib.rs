//! # taskbridge-task
//!
//! Task registry and completion protocol for TaskBridge.
//! Lets a caller without concurrency primitives start background work and
//! observe it through stateless point-queries.
//!
//! ## Features
//!
//! - Unique, never-wrapping task handles
//! - Write-once task records, published atomically per record
//! - Payload-agnostic dispatcher with panic capture
//! - Polling API: status, result, bounded wait, cleanup, stats

pub mod dispatcher;
pub mod handle;
pub mod job;
pub mod poll;
pub mod registry;
pub mod state;
pub mod task;

pub use dispatcher::Dispatcher;
pub use handle::{HandleAllocator, TaskHandle};
pub use job::{
    from_fn, EchoJob, FnJob, Interpreter, InterpreterJob, Job, ScratchDir, ScratchFile,
    ScriptSource, SimulatedJob, CANNED_OUTPUT,
};
pub use poll::{PollConfig, Poller};
pub use registry::{Completion, RegistryStats, TaskRegistry};
pub use state::{
    Outcome, TaskResult, TaskState, TaskStatus, WaitOutcome, ERROR_PREFIX, NOT_FOUND_TEXT,
    STILL_RUNNING_TEXT,
};
pub use task::{TaskRecord, TaskSnapshot};
