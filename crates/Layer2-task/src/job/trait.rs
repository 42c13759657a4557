//! Job trait

use crate::state::Outcome;
use async_trait::async_trait;
use std::future::Future;

/// Job trait - implement to add new kinds of background work
#[async_trait]
pub trait Job: Send + Sync {
    /// Run to completion and report what happened
    async fn run(&self) -> Outcome;

    /// Short description used in logs and snapshots
    fn label(&self) -> String;
}

/// Job backed by an async closure
pub struct FnJob<F> {
    label: String,
    f: F,
}

/// Wrap an async closure as a job
pub fn from_fn<F, Fut>(label: impl Into<String>, f: F) -> FnJob<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    FnJob {
        label: label.into(),
        f,
    }
}

#[async_trait]
impl<F, Fut> Job for FnJob<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    async fn run(&self) -> Outcome {
        (self.f)().await
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}
