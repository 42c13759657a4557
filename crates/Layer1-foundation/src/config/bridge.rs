//! Bridge Config - settings for the task runtime
//!
//! Resolution order: defaults, then the TOML file named by `TASKBRIDGE_CONFIG`,
//! then individual environment overrides.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a TOML config file
pub const CONFIG_ENV: &str = "TASKBRIDGE_CONFIG";

/// Environment override for the interpreter binary
pub const INTERPRETER_ENV: &str = "TASKBRIDGE_INTERPRETER";

/// Environment override for the scratch directory
pub const SCRATCH_DIR_ENV: &str = "TASKBRIDGE_SCRATCH_DIR";

/// Environment variable holding a tracing filter directive
pub const LOG_ENV: &str = "TASKBRIDGE_LOG";

/// Placeholder replaced by the call expression in `call_template`
pub const CALL_PLACEHOLDER: &str = "{call}";

// ============================================================================
// Bridge Config
// ============================================================================

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Interpreter binary for external tasks
    pub interpreter: String,

    /// Extension given to scratch files
    pub script_extension: String,

    /// Template wrapping a function-call expression into a snippet
    pub call_template: String,

    /// Scratch directory for external task inputs
    pub scratch_dir: PathBuf,

    /// Worker threads for the task runtime
    pub worker_threads: usize,

    /// Interval between status checks inside `wait`
    pub poll_interval_ms: u64,

    /// Upper bound applied to every `wait` timeout
    pub max_wait_ms: Option<u64>,

    /// Delay of the canned simulated task
    pub simulated_delay_ms: u64,

    /// Delay of the named echo task
    pub echo_delay_ms: u64,

    /// Default tracing filter
    pub log_filter: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            interpreter: "php".to_string(),
            script_extension: "php".to_string(),
            call_template: "<?php\n{call}\n?>".to_string(),
            scratch_dir: std::env::temp_dir().join("taskbridge_scratch"),
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            poll_interval_ms: 10,
            max_wait_ms: None,
            simulated_delay_ms: 100,
            echo_delay_ms: 200,
            log_filter: "info".to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Parse from TOML text; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Defaults, then `TASKBRIDGE_CONFIG`, then environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load_file(PathBuf::from(path))?,
            None => Self::default(),
        };

        if let Ok(interpreter) = std::env::var(INTERPRETER_ENV) {
            if !interpreter.trim().is_empty() {
                config.interpreter = interpreter;
            }
        }
        if let Some(dir) = std::env::var_os(SCRATCH_DIR_ENV) {
            config.scratch_dir = PathBuf::from(dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the runtime cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.interpreter.trim().is_empty() {
            return Err(Error::Config("interpreter must not be empty".into()));
        }
        if self.worker_threads == 0 {
            return Err(Error::Config("worker_threads must be at least 1".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be at least 1".into()));
        }
        if !self.call_template.contains(CALL_PLACEHOLDER) {
            return Err(Error::Config(format!(
                "call_template must contain {}",
                CALL_PLACEHOLDER
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Builders
    // ========================================================================

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_script_extension(mut self, extension: impl Into<String>) -> Self {
        self.script_extension = extension.into();
        self
    }

    pub fn with_call_template(mut self, template: impl Into<String>) -> Self {
        self.call_template = template.into();
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait_ms = max_wait.map(|d| d.as_millis() as u64);
        self
    }

    pub fn with_delays(mut self, simulated: Duration, echo: Duration) -> Self {
        self.simulated_delay_ms = simulated.as_millis() as u64;
        self.echo_delay_ms = echo.as_millis() as u64;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }

    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_delay_ms)
    }

    pub fn echo_delay(&self) -> Duration {
        Duration::from_millis(self.echo_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.interpreter, "php");
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.simulated_delay(), Duration::from_millis(100));
        assert_eq!(config.echo_delay(), Duration::from_millis(200));
        assert!(config.max_wait().is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BridgeConfig::from_toml_str(
            r#"
            interpreter = "python3"
            script_extension = "py"
            max_wait_ms = 5000
            "#,
        )
        .unwrap();

        assert_eq!(config.interpreter, "python3");
        assert_eq!(config.script_extension, "py");
        assert_eq!(config.max_wait(), Some(Duration::from_secs(5)));
        assert_eq!(config.poll_interval_ms, 10);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(BridgeConfig::from_toml_str("poll_interval_ms = 0").is_err());
        assert!(BridgeConfig::from_toml_str("worker_threads = 0").is_err());
        assert!(BridgeConfig::from_toml_str("call_template = \"no placeholder\"").is_err());
        assert!(BridgeConfig::from_toml_str("interpreter = [1, 2]").is_err());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskbridge.toml");
        std::fs::write(&path, "echo_delay_ms = 50\nlog_filter = \"debug\"\n").unwrap();

        let config = BridgeConfig::load_file(&path).unwrap();
        assert_eq!(config.echo_delay(), Duration::from_millis(50));
        assert_eq!(config.log_filter, "debug");
    }
}
