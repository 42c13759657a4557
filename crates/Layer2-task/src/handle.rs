//! Task handles and the allocator that issues them

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use taskbridge_foundation::{Error, Result};

/// Largest handle ever issued; keeps handles representable as a positive i64.
const MAX_HANDLE: u64 = i64::MAX as u64;

/// Opaque identifier of a submitted task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskHandle(u64);

impl TaskHandle {
    /// Numeric value of the handle
    pub fn get(self) -> u64 {
        self.0
    }

    /// Interpret a boundary integer. Zero and negatives are never issued.
    pub fn from_raw(raw: i64) -> Option<Self> {
        (raw > 0).then_some(Self(raw as u64))
    }

    /// Boundary integer for this handle
    pub fn as_raw(self) -> i64 {
        self.0 as i64
    }
}

impl std::fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues strictly increasing handles, starting at 1
#[derive(Debug)]
pub struct HandleAllocator {
    next: AtomicU64,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Next unused handle. Fails instead of wrapping once the space runs out.
    pub fn next(&self) -> Result<TaskHandle> {
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                (n <= MAX_HANDLE).then(|| n + 1)
            })
            .map(TaskHandle)
            .map_err(|_| Error::HandlesExhausted)
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}
