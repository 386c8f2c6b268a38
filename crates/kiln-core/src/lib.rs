//! Core of kiln: run a command inside a configured environment.
//!
//! This crate provides:
//! - Command dispatch between process replacement and in-process loading
//! - Shebang sniffing for scripts the in-process runtime understands
//! - Process image replacement with exit-code translation
//! - In-process script loading with signal, UI and settings bookkeeping
//! - The settings store and environment configuration hook

pub mod dispatch;
pub mod environment;
pub mod error;
pub mod invocation;
pub mod loader;
pub mod replace;
pub mod resolve;
pub mod runtime;
pub mod settings;
pub mod shebang;
pub mod signals;
pub mod title;
pub mod ui;

#[cfg(test)]
mod testing;

pub use dispatch::CommandDispatcher;
pub use environment::{EnvironmentHook, SharedPathEnvironment};
pub use error::{Error, Result, translate_exec_error};
pub use invocation::{Arg, ExecOptions, ExecutionOutcome, Invocation, ResolvedTarget};
pub use loader::InProcessLoader;
pub use replace::{Exec, ExecRequest, ProcessReplacer, SystemExec};
pub use resolve::{PathResolver, Resolver};
pub use runtime::{
    CommandScript, DylibRuntime, ScriptContext, ScriptError, ScriptFailure, ScriptRuntime,
};
pub use settings::{Flag, Settings};
pub use shebang::ShebangSniffer;
pub use signals::{SignalTable, SystemSignals};
pub use ui::{Shell, Ui, UiHandle};
