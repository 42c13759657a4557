//! C ABI exports for TaskBridge.
//!
//! All functions are `#[no_mangle] pub extern "C"` and use only FFI-safe types.
//! None of them unwinds: every body runs under `catch_unwind` and failures
//! come back as sentinel codes or `Error: ` text.
//!
//! Handles are `int64_t`; values <= 0 are never issued and `-1` is returned
//! when a task cannot be started.

use crate::global;
use crate::runtime::BridgeRuntime;
use crate::text::copy_into;
use std::ffi::{c_char, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::ptr;
use std::time::Duration;
use taskbridge_foundation::Result;
use taskbridge_task::{ScriptSource, TaskHandle, TaskStatus, WaitOutcome};
use tracing::{error, warn};

/// Returned instead of a handle when a task could not be started
pub const SUBMIT_FAILED: i64 = -1;

/// `kind` values for `taskbridge_start_external_task`
pub const SOURCE_SNIPPET: i32 = 0;
pub const SOURCE_FILE: i32 = 1;
pub const SOURCE_CALL: i32 = 2;

fn guarded<T>(fallback: T, f: impl FnOnce() -> T) -> T {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        error!("Panic caught at the TaskBridge boundary");
        fallback
    })
}

fn submit(start: impl FnOnce(&BridgeRuntime) -> Result<TaskHandle>) -> i64 {
    guarded(SUBMIT_FAILED, || {
        let Some(bridge) = global::ensure() else {
            return SUBMIT_FAILED;
        };
        match start(bridge) {
            Ok(handle) => handle.as_raw(),
            Err(e) if e.is_invariant_violation() => {
                error!("Task registry rejected submission: {}", e);
                SUBMIT_FAILED
            }
            Err(e) => {
                warn!("Failed to start task: {}", e);
                SUBMIT_FAILED
            }
        }
    })
}

/// Read a caller string; `None` for null.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn read_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

// ── Lifecycle ───────────────────────────────────────────────────────

/// Start the process-wide runtime. Idempotent. Returns 0=ok, -1=error.
#[no_mangle]
pub extern "C" fn taskbridge_init() -> i32 {
    guarded(-1, || match global::init_from_env() {
        Ok(_) => 0,
        Err(e) => {
            error!("TaskBridge init failed: {}", e);
            -1
        }
    })
}

/// Remove every scratch file. Returns 0=ok, -1=error.
#[no_mangle]
pub extern "C" fn taskbridge_clear_scratch() -> i32 {
    guarded(-1, || {
        let Some(bridge) = global::ensure() else {
            return -1;
        };
        match bridge.clear_scratch() {
            Ok(()) => 0,
            Err(e) => {
                error!("Failed to clear scratch directory: {}", e);
                -1
            }
        }
    })
}

// ── Submission ──────────────────────────────────────────────────────

/// Start the canned simulated task. Returns a handle or -1.
#[no_mangle]
pub extern "C" fn taskbridge_start_task() -> i64 {
    submit(|bridge| bridge.start_task())
}

/// Start a named task whose result echoes `name`. Returns a handle or -1.
///
/// # Safety
///
/// `name` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn taskbridge_start_named_task(name: *const c_char) -> i64 {
    let Some(name) = read_str(name) else {
        return SUBMIT_FAILED;
    };
    submit(|bridge| bridge.start_named_task(&name))
}

/// Start a task that succeeds after `delay_ms`. Returns a handle or -1.
#[no_mangle]
pub extern "C" fn taskbridge_start_delayed_task(delay_ms: i64) -> i64 {
    let Ok(delay_ms) = u64::try_from(delay_ms) else {
        return SUBMIT_FAILED;
    };
    submit(|bridge| bridge.start_delayed_task(delay_ms))
}

/// Run the external interpreter. `kind`: 0=snippet, 1=file path,
/// 2=function-call expression. Returns a handle or -1.
///
/// # Safety
///
/// `text` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn taskbridge_start_external_task(text: *const c_char, kind: i32) -> i64 {
    let Some(text) = read_str(text) else {
        return SUBMIT_FAILED;
    };
    let source = match kind {
        SOURCE_SNIPPET => ScriptSource::Snippet(text),
        SOURCE_FILE => ScriptSource::File(PathBuf::from(text)),
        SOURCE_CALL => ScriptSource::Call(text),
        _ => return SUBMIT_FAILED,
    };
    submit(|bridge| bridge.start_external_task(source))
}

// ── Polling ─────────────────────────────────────────────────────────

/// Returns -1=NotFound, 0=Pending, 1=Done.
#[no_mangle]
pub extern "C" fn taskbridge_check_status(handle: i64) -> i32 {
    guarded(TaskStatus::NotFound.code(), || {
        match (TaskHandle::from_raw(handle), global::ensure()) {
            (Some(handle), Some(bridge)) => bridge.check_status(handle).code(),
            _ => TaskStatus::NotFound.code(),
        }
    })
}

/// Result text of a task, or an `Error: ` sentinel. Must be released with
/// `taskbridge_release_text`. Null only if the runtime cannot start.
#[no_mangle]
pub extern "C" fn taskbridge_get_result(handle: i64) -> *const c_char {
    guarded(ptr::null(), || {
        let Some(bridge) = global::ensure() else {
            return ptr::null();
        };
        match TaskHandle::from_raw(handle) {
            Some(handle) => bridge.lend_result(handle),
            None => bridge
                .ledger()
                .lend(None, taskbridge_task::NOT_FOUND_TEXT.to_string()),
        }
    })
}

/// Copy the result text (or its `Error: ` sentinel) into a caller buffer of
/// `cap` bytes, truncated and NUL-terminated. Returns the full length in
/// bytes without the terminator, so a short buffer can be retried; a null
/// `buf` or zero `cap` only queries the length. -1 if the runtime cannot
/// start. Nothing needs to be released.
///
/// # Safety
///
/// `buf` must be null or valid for writes of `cap` bytes.
#[no_mangle]
pub unsafe extern "C" fn taskbridge_get_result_into(
    handle: i64,
    buf: *mut c_char,
    cap: usize,
) -> i64 {
    guarded(-1, || {
        let Some(bridge) = global::ensure() else {
            return -1;
        };
        let text = match TaskHandle::from_raw(handle) {
            Some(handle) => bridge.poller().get_result(handle),
            None => taskbridge_task::NOT_FOUND_TEXT.to_string(),
        };
        let out: &mut [u8] = if buf.is_null() || cap == 0 {
            &mut []
        } else {
            // SAFETY: the caller guarantees `buf` is writable for `cap` bytes.
            std::slice::from_raw_parts_mut(buf.cast::<u8>(), cap)
        };
        copy_into(&text, out) as i64
    })
}

/// Poll until done or `timeout_ms` elapses (negative counts as 0).
/// Returns 1=Done, -1=NotFound, -2=TimedOut.
#[no_mangle]
pub extern "C" fn taskbridge_wait(handle: i64, timeout_ms: i64) -> i32 {
    guarded(WaitOutcome::NotFound.code(), || {
        let timeout = Duration::from_millis(timeout_ms.max(0) as u64);
        match (TaskHandle::from_raw(handle), global::ensure()) {
            (Some(handle), Some(bridge)) => bridge.wait(handle, timeout).code(),
            _ => WaitOutcome::NotFound.code(),
        }
    })
}

/// Forget a task and free its outstanding text. Unknown handles are ignored.
#[no_mangle]
pub extern "C" fn taskbridge_cleanup(handle: i64) {
    guarded((), || {
        if let (Some(handle), Some(bridge)) = (TaskHandle::from_raw(handle), global::get()) {
            bridge.cleanup(handle);
        }
    })
}

/// Units of work currently alive on the runtime.
#[no_mangle]
pub extern "C" fn taskbridge_active_units() -> i64 {
    guarded(0, || {
        global::get()
            .map(|bridge| bridge.active_units() as i64)
            .unwrap_or(0)
    })
}

/// One-line aggregate stats. Must be released with `taskbridge_release_text`.
#[no_mangle]
pub extern "C" fn taskbridge_stats() -> *const c_char {
    guarded(ptr::null(), || {
        global::ensure()
            .map(|bridge| bridge.lend_stats())
            .unwrap_or(ptr::null())
    })
}

/// JSON snapshot of a task. Must be released with `taskbridge_release_text`.
#[no_mangle]
pub extern "C" fn taskbridge_describe(handle: i64) -> *const c_char {
    guarded(ptr::null(), || {
        let Some(bridge) = global::ensure() else {
            return ptr::null();
        };
        let Some(handle) = TaskHandle::from_raw(handle) else {
            return bridge
                .ledger()
                .lend(None, taskbridge_task::NOT_FOUND_TEXT.to_string());
        };
        bridge.lend_description(handle).unwrap_or_else(|e| {
            error!("Failed to describe task {}: {}", handle, e);
            bridge.ledger().lend(Some(handle), format!("Error: {}", e))
        })
    })
}

// ── Owned text ──────────────────────────────────────────────────────

/// Release text returned by this library. Null and unknown pointers are
/// ignored, and so is a repeated release while the text is among the last
/// [`RELEASE_QUARANTINE`](crate::text::RELEASE_QUARANTINE) released.
/// Releasing older text twice is undefined.
///
/// # Safety
///
/// `text` must be null or a pointer returned by a `taskbridge_*` export.
#[no_mangle]
pub unsafe extern "C" fn taskbridge_release_text(text: *const c_char) {
    guarded((), || {
        if let Some(bridge) = global::get() {
            bridge.ledger().release(text);
        }
    })
}
