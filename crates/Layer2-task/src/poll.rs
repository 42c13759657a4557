//! Polling API - the caller's only window onto running work
//!
//! The foreign caller has no wait primitive, so `wait_for` is a bounded
//! poll-with-sleep on the calling thread.

use crate::handle::TaskHandle;
use crate::registry::{RegistryStats, TaskRegistry};
use crate::state::{TaskResult, TaskStatus, WaitOutcome};
use crate::task::TaskSnapshot;
use std::sync::Arc;
use std::time::{Duration, Instant};
use taskbridge_foundation::BridgeConfig;

/// Polling behavior of `wait_for`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Sleep between status checks
    pub interval: Duration,

    /// Cap applied to every requested timeout
    pub max_wait: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10),
            max_wait: None,
        }
    }
}

impl From<&BridgeConfig> for PollConfig {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_wait: config.max_wait(),
        }
    }
}

/// Read side of the registry as the caller sees it
#[derive(Clone)]
pub struct Poller {
    registry: Arc<TaskRegistry>,
    config: PollConfig,
}

impl Poller {
    pub fn new(registry: Arc<TaskRegistry>, config: PollConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    pub fn check_status(&self, handle: TaskHandle) -> TaskStatus {
        self.registry.status(handle)
    }

    pub fn result(&self, handle: TaskHandle) -> TaskResult {
        self.registry.result(handle)
    }

    /// Output on success, an `Error: ` sentinel otherwise
    pub fn get_result(&self, handle: TaskHandle) -> String {
        self.registry.result(handle).into_text()
    }

    pub fn describe(&self, handle: TaskHandle) -> Option<TaskSnapshot> {
        self.registry.snapshot(handle)
    }

    /// Block the calling thread until the task is done, unknown, or the
    /// timeout elapses. Always checks at least once.
    pub fn wait_for(&self, handle: TaskHandle, timeout: Duration) -> WaitOutcome {
        let timeout = self.clamp(timeout);
        let started = Instant::now();

        loop {
            if let Some(outcome) = self.settled(handle) {
                return outcome;
            }
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return WaitOutcome::TimedOut;
            }
            std::thread::sleep(self.config.interval.min(timeout - elapsed));
        }
    }

    /// `wait_for` for callers already inside an async context
    pub async fn wait_for_async(&self, handle: TaskHandle, timeout: Duration) -> WaitOutcome {
        let timeout = self.clamp(timeout);
        let started = Instant::now();

        loop {
            if let Some(outcome) = self.settled(handle) {
                return outcome;
            }
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return WaitOutcome::TimedOut;
            }
            tokio::time::sleep(self.config.interval.min(timeout - elapsed)).await;
        }
    }

    /// Forget a task. Unknown handles are ignored.
    pub fn cleanup(&self, handle: TaskHandle) -> bool {
        self.registry.remove(handle)
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    /// One-line stats including the live unit count
    pub fn stats_line(&self, active_units: usize) -> String {
        format!("{}, Active Units: {}", self.registry.stats(), active_units)
    }

    fn settled(&self, handle: TaskHandle) -> Option<WaitOutcome> {
        match self.check_status(handle) {
            TaskStatus::Done => Some(WaitOutcome::Done),
            TaskStatus::NotFound => Some(WaitOutcome::NotFound),
            TaskStatus::Pending => None,
        }
    }

    fn clamp(&self, timeout: Duration) -> Duration {
        match self.config.max_wait {
            Some(max) => timeout.min(max),
            None => timeout,
        }
    }
}
