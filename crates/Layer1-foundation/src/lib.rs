//! # taskbridge-foundation
//!
//! Foundation layer for TaskBridge:
//! - Error: shared error type and `Result` alias
//! - Config: runtime settings (interpreter, scratch dir, polling, delays)
//! - Logging: tracing subscriber setup for the boundary

pub mod config;
pub mod error;
pub mod logging;

pub use config::BridgeConfig;
pub use error::{Error, Result};
