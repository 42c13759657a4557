//! Simulated jobs - sleep, then succeed with a fixed message

use crate::job::Job;
use crate::state::Outcome;
use async_trait::async_trait;
use std::time::Duration;

/// Output of the canned simulated task
pub const CANNED_OUTPUT: &str = "Task completed successfully!";

/// Sleeps for a fixed delay and succeeds
#[derive(Debug, Clone)]
pub struct SimulatedJob {
    delay: Duration,
    output: String,
}

impl SimulatedJob {
    /// The canned task: fixed delay, fixed message
    pub fn canned(delay: Duration) -> Self {
        Self {
            delay,
            output: CANNED_OUTPUT.to_string(),
        }
    }

    /// Caller-chosen delay, reported back in the output
    pub fn delayed(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            output: format!("Delayed task completed after {}ms", delay_ms),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl Job for SimulatedJob {
    async fn run(&self) -> Outcome {
        tokio::time::sleep(self.delay).await;
        Outcome::success(self.output.clone())
    }

    fn label(&self) -> String {
        format!("simulated({}ms)", self.delay.as_millis())
    }
}

/// Sleeps, then echoes the task name
#[derive(Debug, Clone)]
pub struct EchoJob {
    name: String,
    delay: Duration,
}

impl EchoJob {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }
}

#[async_trait]
impl Job for EchoJob {
    async fn run(&self) -> Outcome {
        tokio::time::sleep(self.delay).await;
        Outcome::success(format!("Task '{}' completed!", self.name))
    }

    fn label(&self) -> String {
        format!("echo '{}'", self.name)
    }
}
