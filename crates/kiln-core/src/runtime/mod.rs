//! Script runtimes that execute code inside the kiln process.
//!
//! # Runtimes
//!
//! - **`CommandScript`** - the built-in interpreter for kiln scripts.
//! - **`DylibRuntime`** - an interpreter shipped as a shared library and
//!   loaded with `libloading`.
//!
//! A runtime reports how a script ended through [`ScriptError`]: an
//! intentional exit is kept apart from a failure so the loader can let the
//! former through untouched.

mod command;
mod dylib;

use std::any::Any;
use std::fmt;
use std::path::PathBuf;

pub use command::CommandScript;
pub use dylib::DylibRuntime;

/// Interpreter name used in kiln script shebang lines.
pub const SCRIPT_INTERPRETER: &str = "kiln-script";

/// What a loaded script sees as its process state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptContext {
    /// Reported program name (`$0`).
    pub program: PathBuf,
    /// Script arguments, without the program name.
    pub argv: Vec<String>,
}

/// An uncaught error raised by a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFailure {
    /// Short error class, e.g. `CommandFailed`.
    pub class: String,
    pub message: String,
    /// Innermost frame first.
    pub backtrace: Vec<String>,
}

impl ScriptFailure {
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
            backtrace: Vec::new(),
        }
    }

    pub fn with_backtrace(mut self, backtrace: Vec<String>) -> Self {
        self.backtrace = backtrace;
        self
    }

    /// Failure for a panic payload caught while running a script.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Self::new("Panic", message)
    }
}

impl fmt::Display for ScriptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class, self.message)
    }
}

/// How a script stopped, other than by running to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// The script asked to terminate with this exit code.
    Exit(i32),
    /// The script raised an error it did not handle.
    Failure(ScriptFailure),
}

impl From<ScriptFailure> for ScriptError {
    fn from(failure: ScriptFailure) -> Self {
        ScriptError::Failure(failure)
    }
}

/// An interpreter able to run scripts inside the current process.
pub trait ScriptRuntime {
    /// Names the runtime is invoked by in `#!/usr/bin/env <name>` lines.
    fn names(&self) -> Vec<String>;

    /// Absolute path of the runtime's standalone interpreter, if known.
    fn interpreter_path(&self) -> Option<PathBuf>;

    /// Run the script at `ctx.program` to completion.
    fn run(&self, ctx: &ScriptContext) -> Result<(), ScriptError>;
}

/// Path of the standalone `kiln-script` interpreter, next to the running
/// executable.
pub fn sibling_interpreter() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let name = if cfg!(windows) {
        "kiln-script.exe"
    } else {
        SCRIPT_INTERPRETER
    };
    Some(exe.parent()?.join(name))
}
