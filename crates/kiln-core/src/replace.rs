//! Process image replacement.
//!
//! On Unix the target replaces kiln through `execvp`: the PID stays, but
//! kiln's code, argv and signal handlers are gone and control never comes
//! back. Other platforms have no such primitive; there the target is spawned
//! as a child and its exit status is handed back for kiln to exit with.

use std::ffi::OsString;
use std::io;

use crate::error::translate_exec_error;
use crate::invocation::{Arg, ExecOptions, ExecutionOutcome, positional, split_trailing_marker};
use crate::ui::UiHandle;

/// Everything needed to replace the process image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    /// Program to execute: a resolved path, or a bare name for the OS to
    /// look up on `PATH`.
    pub program: OsString,
    /// `argv[0]` of the new image; the command as the user typed it.
    pub arg0: String,
    pub args: Vec<String>,
    pub options: ExecOptions,
}

/// OS primitive replacing the current process image.
pub trait Exec {
    /// Replace the process image.
    ///
    /// Returns `Err` when the OS refused. `Ok` carries the exit code of the
    /// target and is only returned when replacement is emulated.
    fn exec(&self, request: &ExecRequest) -> io::Result<i32>;
}

/// The platform's real exec.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExec;

impl Exec for SystemExec {
    #[cfg(unix)]
    fn exec(&self, request: &ExecRequest) -> io::Result<i32> {
        use std::os::unix::process::CommandExt;
        use std::process::Command;

        let mut cmd = Command::new(&request.program);
        cmd.arg0(&request.arg0).args(&request.args);

        if request.options.close_others {
            // SAFETY: close_inherited_descriptors only calls sysconf and fcntl.
            unsafe {
                cmd.pre_exec(close_inherited_descriptors);
            }
        }

        Err(cmd.exec())
    }

    #[cfg(not(unix))]
    fn exec(&self, request: &ExecRequest) -> io::Result<i32> {
        use std::process::Command;

        let status = Command::new(&request.program).args(&request.args).status()?;
        Ok(status.code().unwrap_or(crate::error::EXIT_GENERIC))
    }
}

/// Mark every descriptor above stderr close-on-exec.
#[cfg(unix)]
fn close_inherited_descriptors() -> io::Result<()> {
    // SAFETY: sysconf and fcntl have no memory-safety requirements; invalid
    // descriptors fail with EBADF and are skipped.
    unsafe {
        let max_fd = descriptor_limit(libc::sysconf(libc::_SC_OPEN_MAX));

        for fd in 3..max_fd {
            let flags = libc::fcntl(fd, libc::F_GETFD);
            if flags >= 0 && flags & libc::FD_CLOEXEC == 0 {
                libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC);
            }
        }
    }
    Ok(())
}

/// Upper bound for descriptor numbers given `sysconf(_SC_OPEN_MAX)`.
///
/// Unknown limits fall back to 1024; limits beyond `c_int` saturate.
#[cfg(unix)]
fn descriptor_limit(open_max: libc::c_long) -> libc::c_int {
    if open_max <= 0 {
        return 1024;
    }
    libc::c_int::try_from(open_max).unwrap_or(libc::c_int::MAX)
}

/// Replaces kiln with the target command.
pub struct ProcessReplacer {
    exec: Box<dyn Exec>,
}

impl ProcessReplacer {
    pub fn new(exec: impl Exec + 'static) -> Self {
        Self {
            exec: Box::new(exec),
        }
    }

    /// Replace the process with `program`.
    ///
    /// `command` is the token the user typed; it becomes `argv[0]` and is
    /// used in error messages. Does not return if the image is replaced.
    pub fn replace(
        &self,
        command: &str,
        program: impl Into<OsString>,
        args: &[Arg],
        ui: &UiHandle,
    ) -> ExecutionOutcome {
        let (args, marker) = split_trailing_marker(args);
        let request = ExecRequest {
            program: program.into(),
            arg0: command.to_string(),
            args: positional(args),
            options: marker.unwrap_or_default(),
        };

        tracing::debug!(
            "Replacing process with {} (argv[0] = {}, {} args)",
            request.program.to_string_lossy(),
            request.arg0,
            request.args.len()
        );

        let suppressed = ui.suppress();
        let result = self.exec.exec(&request);
        suppressed.restore();

        match result {
            Ok(exit_code) => ExecutionOutcome::Replaced { exit_code },
            Err(e) => {
                let err = translate_exec_error(command, e);
                ui.error(&format!("kiln: {err}"));
                if let Some(hint) = err.hint() {
                    ui.warn(hint);
                }
                ExecutionOutcome::Failed {
                    code: err.exit_code(),
                    message: err.to_string(),
                }
            }
        }
    }
}
