//! # taskbridge
//!
//! Foreign-call boundary for TaskBridge, built as a `cdylib` for hosts that
//! can only make synchronous C calls, and as an `rlib` for Rust hosts.
//!
//! - `ffi` - the `taskbridge_*` C exports (declared in `include/taskbridge.h`)
//! - `runtime` - `BridgeRuntime`, one self-contained boundary instance
//! - `global` - the process-wide instance behind the exports
//! - `text` - the owned-text ledger and the `LeasedText` guard

pub mod ffi;
pub mod global;
pub mod runtime;
pub mod text;

pub use runtime::BridgeRuntime;
pub use text::{LeasedText, TextLedger, RELEASE_QUARANTINE};
