//! Config - runtime settings
//!
//! - `bridge.rs` - BridgeConfig (interpreter, scratch dir, polling, delays)

mod bridge;

pub use bridge::{
    BridgeConfig, CALL_PLACEHOLDER, CONFIG_ENV, INTERPRETER_ENV, LOG_ENV, SCRATCH_DIR_ENV,
};
