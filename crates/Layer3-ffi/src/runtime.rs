//! Bridge runtime - everything one boundary instance owns
//!
//! The tokio runtime that executes jobs, the registry and the views onto
//! it, the interpreter setup and the text ledger. Instances are
//! independent; the C exports use the process-wide one from `global`.

use crate::text::{LeasedText, TextLedger};
use std::ffi::c_char;
use std::sync::Arc;
use std::time::Duration;
use taskbridge_foundation::{BridgeConfig, Result};
use taskbridge_task::{
    Dispatcher, EchoJob, Interpreter, InterpreterJob, PollConfig, Poller, ScratchDir,
    ScriptSource, SimulatedJob, TaskHandle, TaskRegistry, TaskStatus, WaitOutcome,
    NOT_FOUND_TEXT,
};
use tokio::runtime::{Builder, Runtime};
use tracing::info;

pub struct BridgeRuntime {
    config: BridgeConfig,
    dispatcher: Dispatcher,
    poller: Poller,
    interpreter: Arc<Interpreter>,
    ledger: TextLedger,
    // Last field: dropped after everything holding a runtime handle.
    runtime: Runtime,
}

impl BridgeRuntime {
    /// Build the worker runtime and the scratch directory
    pub fn start(config: BridgeConfig) -> Result<Self> {
        config.validate()?;

        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .thread_name("taskbridge-worker")
            .enable_all()
            .build()?;

        let scratch = ScratchDir::create(&config.scratch_dir)?;
        let registry = Arc::new(TaskRegistry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry), runtime.handle().clone());
        let poller = Poller::new(registry, PollConfig::from(&config));
        let interpreter = Arc::new(Interpreter::new(&config, scratch));

        info!(
            "TaskBridge runtime started: {} worker(s), interpreter '{}', scratch {}",
            config.worker_threads,
            config.interpreter,
            config.scratch_dir.display()
        );

        Ok(Self {
            config,
            dispatcher,
            poller,
            interpreter,
            ledger: TextLedger::new(),
            runtime,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    pub fn ledger(&self) -> &TextLedger {
        &self.ledger
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    // ========================================================================
    // Submission
    // ========================================================================

    pub fn start_task(&self) -> Result<TaskHandle> {
        self.dispatcher
            .submit(SimulatedJob::canned(self.config.simulated_delay()))
    }

    pub fn start_named_task(&self, name: &str) -> Result<TaskHandle> {
        self.dispatcher
            .submit(EchoJob::new(name, self.config.echo_delay()))
    }

    pub fn start_delayed_task(&self, delay_ms: u64) -> Result<TaskHandle> {
        self.dispatcher.submit(SimulatedJob::delayed(delay_ms))
    }

    pub fn start_external_task(&self, source: ScriptSource) -> Result<TaskHandle> {
        self.dispatcher
            .submit(InterpreterJob::new(Arc::clone(&self.interpreter), source))
    }

    // ========================================================================
    // Polling
    // ========================================================================

    pub fn check_status(&self, handle: TaskHandle) -> TaskStatus {
        self.poller.check_status(handle)
    }

    pub fn wait(&self, handle: TaskHandle, timeout: Duration) -> WaitOutcome {
        self.poller.wait_for(handle, timeout)
    }

    /// Forget a task and free any text still lent for it
    pub fn cleanup(&self, handle: TaskHandle) {
        self.poller.cleanup(handle);
        self.ledger.release_owned_by(handle);
    }

    pub fn active_units(&self) -> usize {
        self.dispatcher.active_units()
    }

    pub fn stats_line(&self) -> String {
        self.poller.stats_line(self.active_units())
    }

    /// JSON snapshot of a task, `None` if unknown
    pub fn describe(&self, handle: TaskHandle) -> Result<Option<String>> {
        self.poller
            .describe(handle)
            .map(|snapshot| serde_json::to_string(&snapshot))
            .transpose()
            .map_err(Into::into)
    }

    pub fn clear_scratch(&self) -> Result<()> {
        self.interpreter.scratch().clear()
    }

    // ========================================================================
    // Owned text
    // ========================================================================

    pub fn lend_result(&self, handle: TaskHandle) -> *const c_char {
        let text = self.poller.get_result(handle);
        self.ledger.lend(Some(handle), text)
    }

    /// Result text for Rust hosts, released when the guard drops
    pub fn get_result_leased(&self, handle: TaskHandle) -> LeasedText<'_> {
        self.ledger.lease(self.poller.get_result(handle))
    }

    pub fn lend_stats(&self) -> *const c_char {
        self.ledger.lend(None, self.stats_line())
    }

    pub fn lend_description(&self, handle: TaskHandle) -> Result<*const c_char> {
        let text = self
            .describe(handle)?
            .unwrap_or_else(|| NOT_FOUND_TEXT.to_string());
        Ok(self.ledger.lend(Some(handle), text))
    }
}
