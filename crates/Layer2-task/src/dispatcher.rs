//! Dispatcher - starts one unit of work per submitted job
//!
//! Each job runs on the tokio runtime the dispatcher was built with. Whatever
//! the job does, including panicking, the worker ends with exactly one
//! `complete` call on the registry.

use crate::handle::TaskHandle;
use crate::job::Job;
use crate::registry::{Completion, TaskRegistry};
use crate::state::Outcome;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use taskbridge_foundation::{Error, Result};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

/// Label recorded for a job whose `label()` panicked
const UNLABELED: &str = "unlabeled job";

/// Hands jobs to the runtime and records their outcome
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<TaskRegistry>,
    runtime: Handle,
}

impl Dispatcher {
    /// Create a dispatcher spawning onto the given runtime
    pub fn new(registry: Arc<TaskRegistry>, runtime: Handle) -> Self {
        Self { registry, runtime }
    }

    /// Create a dispatcher for the runtime the caller is running on
    pub fn current(registry: Arc<TaskRegistry>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;
        Ok(Self::new(registry, runtime))
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Submit a job
    pub fn submit<J: Job + 'static>(&self, job: J) -> Result<TaskHandle> {
        self.submit_boxed(Box::new(job))
    }

    /// Submit an already boxed job
    pub fn submit_boxed(&self, job: Box<dyn Job>) -> Result<TaskHandle> {
        let handle = self.registry.next_handle()?;
        let label = std::panic::catch_unwind(AssertUnwindSafe(|| job.label()))
            .unwrap_or_else(|panic| {
                warn!("Job label panicked: {}", panic_message(panic.as_ref()));
                UNLABELED.to_string()
            });
        self.registry.register(handle, label.as_str())?;

        info!("Submitting task {}: {}", handle, label);

        let registry = Arc::clone(&self.registry);
        self.runtime.spawn(async move {
            let outcome = match AssertUnwindSafe(job.run()).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!("Task {} panicked: {}", handle, message);
                    Outcome::failure(format!("panic: {}", message))
                }
            };

            match registry.complete(handle, outcome) {
                Ok(Completion::Published) => debug!("Task {} published", handle),
                Ok(Completion::Discarded) => {}
                Err(e) => error!("Task {} completion rejected: {}", handle, e),
            }
        });

        Ok(handle)
    }

    /// Units of work currently alive on the runtime
    pub fn active_units(&self) -> usize {
        self.runtime.metrics().num_alive_tasks()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{from_fn, SimulatedJob};
    use crate::state::{TaskResult, TaskStatus};
    use std::time::Duration;

    async fn settle(registry: &TaskRegistry, handle: TaskHandle) {
        for _ in 0..200 {
            if registry.status(handle) != TaskStatus::Pending {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("task {} never finished", handle);
    }

    #[tokio::test]
    async fn test_submit_registers_pending() {
        let dispatcher = Dispatcher::current(Arc::new(TaskRegistry::new())).unwrap();
        let handle = dispatcher
            .submit(SimulatedJob::canned(Duration::from_millis(50)))
            .unwrap();

        assert_eq!(dispatcher.registry().status(handle), TaskStatus::Pending);
        settle(dispatcher.registry(), handle).await;
        assert_eq!(
            dispatcher.registry().result(handle),
            TaskResult::Completed(crate::job::CANNED_OUTPUT.into())
        );
    }

    #[tokio::test]
    async fn test_failure_outcome_recorded() {
        let dispatcher = Dispatcher::current(Arc::new(TaskRegistry::new())).unwrap();
        let handle = dispatcher
            .submit(from_fn("fails", || async { Outcome::failure("bad input") }))
            .unwrap();

        settle(dispatcher.registry(), handle).await;
        assert_eq!(
            dispatcher.registry().result(handle),
            TaskResult::Failed("bad input".into())
        );
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let dispatcher = Dispatcher::current(Arc::new(TaskRegistry::new())).unwrap();
        let handle = dispatcher
            .submit(from_fn("panics", || async {
                if true {
                    panic!("worker exploded");
                }
                Outcome::success("unreachable")
            }))
            .unwrap();

        settle(dispatcher.registry(), handle).await;
        assert_eq!(
            dispatcher.registry().result(handle),
            TaskResult::Failed("panic: worker exploded".into())
        );
    }

    #[tokio::test]
    async fn test_cleanup_while_pending_is_not_resurrected() {
        let dispatcher = Dispatcher::current(Arc::new(TaskRegistry::new())).unwrap();
        let handle = dispatcher
            .submit(SimulatedJob::canned(Duration::from_millis(20)))
            .unwrap();

        assert!(dispatcher.registry().remove(handle));
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(dispatcher.registry().status(handle), TaskStatus::NotFound);
        assert!(dispatcher.registry().is_empty());
    }

    struct BadLabel;

    #[async_trait::async_trait]
    impl Job for BadLabel {
        async fn run(&self) -> Outcome {
            Outcome::success("ran anyway")
        }

        fn label(&self) -> String {
            panic!("no label")
        }
    }

    #[tokio::test]
    async fn test_panicking_label_does_not_escape_submit() {
        let dispatcher = Dispatcher::current(Arc::new(TaskRegistry::new())).unwrap();
        let handle = dispatcher.submit(BadLabel).unwrap();

        assert_eq!(
            dispatcher.registry().snapshot(handle).unwrap().label,
            UNLABELED
        );
        settle(dispatcher.registry(), handle).await;
        assert_eq!(
            dispatcher.registry().result(handle),
            TaskResult::Completed("ran anyway".into())
        );
    }

    #[test]
    fn test_current_outside_runtime_fails() {
        let result = Dispatcher::current(Arc::new(TaskRegistry::new()));
        assert!(matches!(result, Err(Error::Runtime(_))));
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }
}
