//! In-process script loading.
//!
//! The loader runs a kiln script inside the current process instead of
//! replacing it. It hands the script the process state it expects and gets
//! out of its way:
//!
//! ```text
//! strip trailing marker
//!     │
//!     ├── argv / program name / process title
//!     ├── UI suppressed ────────────────┐
//!     ├── disable-shared-path = false ──┤ scoped to this load
//!     ├── environment hook              │
//!     ├── signals reset to default      │
//!     └── ScriptRuntime::run ───────────┘
//! ```
//!
//! An intentional exit from the script is passed through unchanged. Any
//! other failure is reported with a backtrace cut off where the loader's
//! own frames begin.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::environment::EnvironmentHook;
use crate::error::{EXIT_GENERIC, Error};
use crate::invocation::{Arg, ExecutionOutcome, positional, split_trailing_marker};
use crate::runtime::{ScriptContext, ScriptError, ScriptFailure, ScriptRuntime};
use crate::settings::{Flag, Settings};
use crate::signals::{SignalTable, reset_dispositions};
use crate::title;
use crate::ui::UiHandle;

/// Frames at or below this module belong to kiln, not to the script.
const OWN_FRAMES: &str = module_path!();

/// Loads and runs scripts in the current process.
pub struct InProcessLoader {
    runtime: Box<dyn ScriptRuntime>,
    environment: Box<dyn EnvironmentHook>,
    signals: Box<dyn SignalTable>,
}

impl InProcessLoader {
    pub fn new(
        runtime: impl ScriptRuntime + 'static,
        environment: impl EnvironmentHook + 'static,
        signals: impl SignalTable + 'static,
    ) -> Self {
        Self {
            runtime: Box::new(runtime),
            environment: Box::new(environment),
            signals: Box::new(signals),
        }
    }

    pub fn runtime(&self) -> &dyn ScriptRuntime {
        self.runtime.as_ref()
    }

    /// Load `file` and run it with `args`.
    ///
    /// `command` is the token the user typed and only appears in failure
    /// reports.
    pub fn load(
        &self,
        command: &str,
        file: &Path,
        args: &[Arg],
        ui: &UiHandle,
        settings: &mut Settings,
    ) -> ExecutionOutcome {
        let (args, _marker) = split_trailing_marker(args);
        let ctx = ScriptContext {
            program: file.to_path_buf(),
            argv: positional(args),
        };

        let file_name = file.display().to_string();
        if !title::set_process_title(&title::script_title(&file_name, &ctx.argv)) {
            tracing::debug!("Process title not supported here");
        }

        let result = {
            let _suppressed = ui.suppress();
            let settings = settings.override_flag(Flag::DisableSharedPath, false);
            self.run_configured(&ctx, &settings)
        };

        match result {
            Ok(()) => ExecutionOutcome::Loaded { exit_code: 0 },
            Err(ScriptError::Exit(exit_code)) => {
                tracing::debug!("{} exited with {}", file_name, exit_code);
                ExecutionOutcome::Loaded { exit_code }
            }
            Err(ScriptError::Failure(failure)) => {
                let err = Error::LoadFailure {
                    command: command.to_string(),
                    file: file_name,
                };
                report_failure(ui, &err, &failure);
                ExecutionOutcome::Failed {
                    code: EXIT_GENERIC,
                    message: err.to_string(),
                }
            }
        }
    }

    fn run_configured(&self, ctx: &ScriptContext, settings: &Settings) -> Result<(), ScriptError> {
        self.environment
            .configure(settings)
            .map_err(|e| ScriptFailure::new("EnvironmentError", e.to_string()))?;

        let reset = reset_dispositions(self.signals.as_ref());
        tracing::debug!("Reset {} signal dispositions", reset.len());

        match panic::catch_unwind(AssertUnwindSafe(|| self.runtime.run(ctx))) {
            Ok(result) => result,
            Err(payload) => Err(ScriptFailure::from_panic(payload).into()),
        }
    }
}

fn report_failure(ui: &UiHandle, err: &Error, failure: &ScriptFailure) {
    ui.error(&err.to_string());
    ui.error(&failure.to_string());
    for frame in truncate_backtrace(&failure.backtrace) {
        ui.error(&format!("  {frame}"));
    }
}

/// Frames up to, not including, the first one inside the loader.
pub fn truncate_backtrace(frames: &[String]) -> &[String] {
    let end = frames
        .iter()
        .position(|frame| frame.contains(OWN_FRAMES))
        .unwrap_or(frames.len());
    &frames[..end]
}
