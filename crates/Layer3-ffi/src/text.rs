//! Owned text handed across the boundary
//!
//! Every string returned to the caller is lent from a [`TextLedger`], which
//! keeps the backing `CString` alive until the caller releases it. Entries
//! are freed exactly once: releasing an unknown pointer is a no-op, and
//! cleaning up a task frees whatever text it still has outstanding.
//!
//! The ledger is keyed by address, so a released buffer is not freed right
//! away. It sits in a bounded quarantine first, which keeps its address from
//! being lent again while a stale second release of it is still plausible.
//! Such a release finds nothing lent at that address and does nothing.

use parking_lot::Mutex;
use std::borrow::Cow;
use std::collections::{HashMap, VecDeque};
use std::ffi::{c_char, CStr, CString};
use taskbridge_task::TaskHandle;
use tracing::debug;

/// How many released buffers stay allocated before they are really freed
pub const RELEASE_QUARANTINE: usize = 256;

struct Lent {
    owner: Option<TaskHandle>,
    text: CString,
}

#[derive(Default)]
struct LedgerState {
    lent: HashMap<usize, Lent>,
    quarantine: VecDeque<CString>,
}

impl LedgerState {
    fn retire(&mut self, text: CString) {
        self.quarantine.push_back(text);
        if self.quarantine.len() > RELEASE_QUARANTINE {
            self.quarantine.pop_front();
        }
    }
}

/// Table of strings currently lent to the caller, keyed by address
#[derive(Default)]
pub struct TextLedger {
    state: Mutex<LedgerState>,
}

impl TextLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lend `text` to the caller. Interior NUL bytes are dropped.
    pub fn lend(&self, owner: Option<TaskHandle>, text: String) -> *const c_char {
        let text = to_cstring(text);
        let ptr = text.as_ptr();
        self.state
            .lock()
            .lent
            .insert(ptr as usize, Lent { owner, text });
        ptr
    }

    /// Lend `text` to Rust code; released when the guard drops.
    ///
    /// Leases belong to no task, so cleanup never frees them under the guard.
    pub fn lease(&self, text: String) -> LeasedText<'_> {
        let ptr = self.lend(None, text);
        LeasedText { ledger: self, ptr }
    }

    /// Free a lent string. Returns false for null, unknown or already
    /// released pointers.
    pub fn release(&self, ptr: *const c_char) -> bool {
        if ptr.is_null() {
            return false;
        }
        let mut state = self.state.lock();
        let removed = state.lent.remove(&(ptr as usize));
        match removed {
            Some(entry) => {
                state.retire(entry.text);
                true
            }
            None => false,
        }
    }

    /// Free every string still lent for `handle`
    pub fn release_owned_by(&self, handle: TaskHandle) -> usize {
        let mut state = self.state.lock();
        let owned: Vec<usize> = state
            .lent
            .iter()
            .filter(|(_, entry)| entry.owner == Some(handle))
            .map(|(&addr, _)| addr)
            .collect();

        for addr in &owned {
            if let Some(entry) = state.lent.remove(addr) {
                state.retire(entry.text);
            }
        }

        if !owned.is_empty() {
            debug!(
                "Released {} outstanding text buffer(s) of task {}",
                owned.len(),
                handle
            );
        }
        owned.len()
    }

    /// Number of strings not yet released
    pub fn outstanding(&self) -> usize {
        self.state.lock().lent.len()
    }

    #[cfg(test)]
    fn quarantined(&self) -> usize {
        self.state.lock().quarantine.len()
    }
}

fn to_cstring(text: String) -> CString {
    CString::new(text).unwrap_or_else(|e| {
        let mut bytes = e.into_vec();
        bytes.retain(|&b| b != 0);
        CString::new(bytes).unwrap_or_default()
    })
}

/// Copy `text` into a caller buffer as a NUL-terminated string, truncating
/// to fit. Returns the full length in bytes, excluding the terminator, so a
/// caller can retry with a larger buffer. Interior NUL bytes are dropped.
pub fn copy_into(text: &str, out: &mut [u8]) -> usize {
    let text = to_cstring(text.to_string());
    let bytes = text.as_bytes();
    if let Some(room) = out.len().checked_sub(1) {
        let n = bytes.len().min(room);
        out[..n].copy_from_slice(&bytes[..n]);
        out[n] = 0;
    }
    bytes.len()
}

/// Scoped guard over a lent string.
///
/// Releases the string back to the ledger it came from when dropped, so
/// Rust hosts never have to pair the calls by hand.
pub struct LeasedText<'a> {
    ledger: &'a TextLedger,
    ptr: *const c_char,
}

impl LeasedText<'static> {
    /// Take ownership of a string returned by a `taskbridge_*` export.
    /// `None` for null or if the process-wide bridge was never started.
    ///
    /// # Safety
    ///
    /// `ptr` must come from a `taskbridge_*` export returning owned text, must
    /// not have been released yet, and the task it belongs to must not be
    /// cleaned up while the guard is alive.
    pub unsafe fn from_export(ptr: *const c_char) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        crate::global::get().map(|bridge| LeasedText {
            ledger: bridge.ledger(),
            ptr,
        })
    }
}

impl LeasedText<'_> {
    pub fn to_str(&self) -> Cow<'_, str> {
        // SAFETY: the ledger keeps the buffer alive until this guard drops.
        unsafe { CStr::from_ptr(self.ptr) }.to_string_lossy()
    }
}

impl Drop for LeasedText<'_> {
    fn drop(&mut self) {
        self.ledger.release(self.ptr);
    }
}
