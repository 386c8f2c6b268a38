//! Script runtime provided by a shared library.
//!
//! The library must export:
//!
//! ```c
//! int kiln_script_main(const char *path, int argc, const char *const *argv);
//! ```
//!
//! A return of `0` means the script completed, a positive value is an
//! intentional exit with that code, and a negative value is a failure.

use std::ffi::{CString, c_char, c_int};
use std::path::PathBuf;

use libloading::{Library, Symbol};

use super::{SCRIPT_INTERPRETER, ScriptContext, ScriptError, ScriptFailure, ScriptRuntime};

/// Exported entry point looked up in the runtime library.
pub const ENTRY_SYMBOL: &[u8] = b"kiln_script_main";

type EntryFn = unsafe extern "C" fn(*const c_char, c_int, *const *const c_char) -> c_int;

/// Runtime loaded from a shared library on first use.
#[derive(Debug, Clone)]
pub struct DylibRuntime {
    library_path: PathBuf,
    interpreter: Option<PathBuf>,
}

impl DylibRuntime {
    pub fn new(library_path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: library_path.into(),
            interpreter: super::sibling_interpreter(),
        }
    }

    pub fn library_path(&self) -> &PathBuf {
        &self.library_path
    }

    fn call_entry(&self, ctx: &ScriptContext) -> Result<c_int, ScriptFailure> {
        let path = to_cstring(&ctx.program.to_string_lossy())?;
        let args = ctx
            .argv
            .iter()
            .map(|arg| to_cstring(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let argv: Vec<*const c_char> = args.iter().map(|arg| arg.as_ptr()).collect();
        let argc = c_int::try_from(argv.len())
            .map_err(|_| ScriptFailure::new("ArgumentError", "too many arguments"))?;

        // SAFETY: loading a library runs its initializers; the library is
        // named by the user's settings and trusted like any runtime binary.
        let library = unsafe { Library::new(&self.library_path) }
            .map_err(|e| ScriptFailure::new("LibraryLoad", e.to_string()))?;

        // SAFETY: the symbol type matches the documented entry signature.
        let entry: Symbol<EntryFn> = unsafe { library.get(ENTRY_SYMBOL) }
            .map_err(|e| ScriptFailure::new("LibraryLoad", e.to_string()))?;

        tracing::debug!(
            "Calling {} in {}",
            String::from_utf8_lossy(ENTRY_SYMBOL),
            self.library_path.display()
        );

        // SAFETY: every pointer refers to a CString kept alive in `path` and
        // `args` until the call returns.
        let code = unsafe { entry(path.as_ptr(), argc, argv.as_ptr()) };
        Ok(code)
    }
}

fn to_cstring(value: &str) -> Result<CString, ScriptFailure> {
    CString::new(value).map_err(|e| ScriptFailure::new("ArgumentError", e.to_string()))
}

impl ScriptRuntime for DylibRuntime {
    fn names(&self) -> Vec<String> {
        vec![SCRIPT_INTERPRETER.to_string()]
    }

    fn interpreter_path(&self) -> Option<PathBuf> {
        self.interpreter.clone()
    }

    fn run(&self, ctx: &ScriptContext) -> Result<(), ScriptError> {
        match self.call_entry(ctx)? {
            0 => Ok(()),
            code if code > 0 => Err(ScriptError::Exit(code)),
            code => Err(ScriptError::Failure(ScriptFailure::new(
                "RuntimeError",
                format!("{} returned {code}", self.library_path.display()),
            ))),
        }
    }
}
