//! Interpreter job - runs an external interpreter against a script
//!
//! Snippets and call expressions are written to a uniquely named file in the
//! scratch directory, executed, and the file is removed afterwards whatever
//! the outcome. Output is stdout followed by stderr.

use crate::job::Job;
use crate::state::Outcome;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use taskbridge_foundation::config::CALL_PLACEHOLDER;
use taskbridge_foundation::{BridgeConfig, Result};
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

/// Marker appended to the diagnostic of a failed interpreter run
const EXECUTION_FAILED: &str = "interpreter execution failed";

// ============================================================================
// Scratch directory
// ============================================================================

/// Process-wide directory holding scratch scripts
#[derive(Debug, Clone)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create (if needed) and wrap a scratch directory
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove every scratch file and recreate the empty directory
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        std::fs::create_dir_all(&self.path)?;
        debug!("Cleared scratch directory {}", self.path.display());
        Ok(())
    }

    /// Reserve a fresh, uniquely named file path
    pub fn new_file(&self, extension: &str) -> ScratchFile {
        let name = if extension.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            format!("{}.{}", Uuid::new_v4(), extension)
        };
        ScratchFile {
            path: self.path.join(name),
        }
    }
}

/// A scratch file that is deleted when dropped
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove scratch file {}: {}", self.path.display(), e);
            }
        }
    }
}

// ============================================================================
// Interpreter
// ============================================================================

/// How to invoke the external interpreter
#[derive(Debug, Clone)]
pub struct Interpreter {
    program: String,
    script_extension: String,
    call_template: String,
    scratch: ScratchDir,
}

impl Interpreter {
    pub fn new(config: &BridgeConfig, scratch: ScratchDir) -> Self {
        Self {
            program: config.interpreter.clone(),
            script_extension: config.script_extension.clone(),
            call_template: config.call_template.clone(),
            scratch,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    /// Turn a function-call expression into a runnable snippet
    pub fn wrap_call(&self, call: &str) -> String {
        self.call_template.replace(CALL_PLACEHOLDER, call)
    }

    /// Write a snippet to a scratch file and run it
    async fn run_snippet(&self, code: &str) -> Outcome {
        let file = self.scratch.new_file(&self.script_extension);
        if let Err(e) = tokio::fs::write(file.path(), code).await {
            return Outcome::failure(format!("failed to write scratch file: {}", e));
        }
        self.execute(file.path()).await
        // `file` drops here and removes the script
    }

    /// Run an existing script file
    async fn run_file(&self, path: &Path) -> Outcome {
        match tokio::fs::try_exists(path).await {
            Ok(true) => self.execute(path).await,
            _ => Outcome::failure(format!("file not found: {}", path.display())),
        }
    }

    async fn execute(&self, script: &Path) -> Outcome {
        debug!("Executing {} {}", self.program, script.display());

        let output = Command::new(&self.program)
            .arg(script)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                interpret_exit(combined, output.status)
            }
            Err(e) => Outcome::failure(format!("failed to spawn {}: {}", self.program, e)),
        }
    }
}

fn interpret_exit(combined: String, status: ExitStatus) -> Outcome {
    if status.success() {
        return Outcome::success(combined);
    }

    let marker = format!("{}: {}", EXECUTION_FAILED, status);
    if combined.is_empty() {
        Outcome::failure(marker)
    } else if combined.ends_with('\n') {
        Outcome::failure(format!("{}{}", combined, marker))
    } else {
        Outcome::failure(format!("{}\n{}", combined, marker))
    }
}

// ============================================================================
// Interpreter Job
// ============================================================================

/// What the interpreter should run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// Source code, written to a scratch file
    Snippet(String),

    /// Path to an existing script
    File(PathBuf),

    /// Function-call expression, wrapped with the call template
    Call(String),
}

/// Runs the interpreter against one script source
#[derive(Debug, Clone)]
pub struct InterpreterJob {
    interpreter: Arc<Interpreter>,
    source: ScriptSource,
}

impl InterpreterJob {
    pub fn new(interpreter: Arc<Interpreter>, source: ScriptSource) -> Self {
        Self {
            interpreter,
            source,
        }
    }
}

#[async_trait]
impl Job for InterpreterJob {
    async fn run(&self) -> Outcome {
        match &self.source {
            ScriptSource::Snippet(code) => self.interpreter.run_snippet(code).await,
            ScriptSource::File(path) => self.interpreter.run_file(path).await,
            ScriptSource::Call(call) => {
                let code = self.interpreter.wrap_call(call);
                self.interpreter.run_snippet(&code).await
            }
        }
    }

    fn label(&self) -> String {
        match &self.source {
            ScriptSource::Snippet(_) => format!("{} snippet", self.interpreter.program),
            ScriptSource::File(path) => format!("{} {}", self.interpreter.program, path.display()),
            ScriptSource::Call(call) => format!("{} call {}", self.interpreter.program, call),
        }
    }
}
