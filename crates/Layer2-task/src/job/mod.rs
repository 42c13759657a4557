//! Units of work
//!
//! Every payload implements [`Job`] and reports an [`Outcome`](crate::Outcome);
//! the dispatcher treats them all the same way.
//! - `SimulatedJob` / `EchoJob` - fixed-delay simulations
//! - `InterpreterJob` - external interpreter against a snippet, file or call
//! - `FnJob` - any async closure

pub mod interpreter;
pub mod simulated;
pub mod r#trait;

pub use interpreter::{Interpreter, InterpreterJob, ScratchDir, ScratchFile, ScriptSource};
pub use r#trait::{from_fn, FnJob, Job};
pub use simulated::{EchoJob, SimulatedJob, CANNED_OUTPUT};
