//! The process-wide bridge used by the C exports
//!
//! A C caller cannot carry a context pointer between calls, so the exports
//! share one lazily started [`BridgeRuntime`]. Rust code can build its own
//! instances instead.

use crate::runtime::BridgeRuntime;
use parking_lot::Mutex;
use std::sync::OnceLock;
use taskbridge_foundation::{logging, BridgeConfig, Result};
use tracing::error;

static BRIDGE: OnceLock<BridgeRuntime> = OnceLock::new();
static INIT: Mutex<()> = parking_lot::const_mutex(());

/// The bridge, if already started
pub fn get() -> Option<&'static BridgeRuntime> {
    BRIDGE.get()
}

/// Start the bridge with `config`. Idempotent: once started, later calls
/// return the existing bridge and ignore their config.
pub fn init_with(config: BridgeConfig) -> Result<&'static BridgeRuntime> {
    if let Some(bridge) = BRIDGE.get() {
        return Ok(bridge);
    }

    let _guard = INIT.lock();
    if let Some(bridge) = BRIDGE.get() {
        return Ok(bridge);
    }

    logging::init(&config.log_filter);
    let bridge = BridgeRuntime::start(config)?;
    Ok(BRIDGE.get_or_init(|| bridge))
}

/// Start the bridge from environment configuration
pub fn init_from_env() -> Result<&'static BridgeRuntime> {
    if let Some(bridge) = BRIDGE.get() {
        return Ok(bridge);
    }
    init_with(BridgeConfig::from_env()?)
}

/// The bridge, starting it from the environment on first use
pub(crate) fn ensure() -> Option<&'static BridgeRuntime> {
    match init_from_env() {
        Ok(bridge) => Some(bridge),
        Err(e) => {
            error!("TaskBridge runtime unavailable: {}", e);
            None
        }
    }
}
