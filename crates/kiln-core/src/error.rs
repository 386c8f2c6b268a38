//! Error types for kiln-core.
//!
//! Besides the error enum itself, this module owns the mapping from
//! OS-level execution failures to user-facing messages and process exit
//! codes.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for kiln-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Exit code when the target exists but cannot be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

/// Exit code when the target command cannot be found.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit code when no command was given at all.
pub const EXIT_MISSING_COMMAND: i32 = 128;

/// Exit code for every other failure, including uncaught script errors.
pub const EXIT_GENERIC: i32 = 1;

/// Errors that can occur in kiln-core.
#[derive(Debug, Error)]
pub enum Error {
    /// `exec` was called without a command.
    #[error("kiln exec needs a command to run. Example: kiln exec rspec")]
    MissingCommand,

    /// The target exists but the OS refused to execute it.
    #[error("not executable: {command}")]
    NotExecutable { command: String },

    /// The target could not be found.
    #[error("command not found: {command}")]
    CommandNotFound { command: String },

    /// Any other OS error raised while replacing the process image.
    #[error("failed to execute {command}: {source}")]
    Exec {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Code loaded into this process failed with an uncaught error.
    #[error("failed to load command: {command} ({file})")]
    LoadFailure { command: String, file: String },

    /// Invalid or unreadable settings.
    #[error("settings error: {0}")]
    Settings(String),

    /// Malformed settings file.
    #[error("invalid settings file {}: {source}", path.display())]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Exit code the process should terminate with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::NotExecutable { .. } => EXIT_NOT_EXECUTABLE,
            Error::CommandNotFound { .. } => EXIT_NOT_FOUND,
            Error::MissingCommand => EXIT_MISSING_COMMAND,
            Error::Exec { .. }
            | Error::LoadFailure { .. }
            | Error::Settings(_)
            | Error::SettingsParse { .. }
            | Error::Io(_) => EXIT_GENERIC,
        }
    }

    /// Remediation hint shown after the error message, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::CommandNotFound { .. } => Some("Install missing executables first."),
            Error::NotExecutable { .. } => {
                Some("Check the file's permissions and its interpreter line.")
            }
            Error::SettingsParse { .. } => Some("Fix or remove the settings file named above."),
            _ => None,
        }
    }

    /// Render the error followed by its hint, one per line.
    pub fn with_hint(&self) -> String {
        match self.hint() {
            Some(hint) => format!("{}\n{}", self, hint),
            None => self.to_string(),
        }
    }
}

/// Translate a failed image replacement into a user-facing error.
///
/// `command` is the command as the user typed it, not the resolved path.
pub fn translate_exec_error(command: &str, err: io::Error) -> Error {
    let command = command.to_string();

    if err.raw_os_error() == Some(libc::ENOEXEC) {
        return Error::NotExecutable { command };
    }

    match err.kind() {
        io::ErrorKind::PermissionDenied => Error::NotExecutable { command },
        io::ErrorKind::NotFound => Error::CommandNotFound { command },
        _ => Error::Exec {
            command,
            source: err,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_table() {
        assert_eq!(Error::MissingCommand.exit_code(), 128);
        assert_eq!(
            Error::NotExecutable { command: "x".into() }.exit_code(),
            126
        );
        assert_eq!(
            Error::CommandNotFound { command: "x".into() }.exit_code(),
            127
        );
        assert_eq!(
            Error::LoadFailure {
                command: "x".into(),
                file: "/bin/x".into()
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn test_translate_permission_denied() {
        let err = translate_exec_error("tool", io::Error::from_raw_os_error(libc::EACCES));
        assert!(matches!(err, Error::NotExecutable { ref command } if command == "tool"));
        assert_eq!(err.to_string(), "not executable: tool");
    }

    #[test]
    fn test_translate_exec_format_error() {
        let err = translate_exec_error("tool", io::Error::from_raw_os_error(libc::ENOEXEC));
        assert_eq!(err.exit_code(), 126);
    }

    #[test]
    fn test_translate_not_found_has_hint() {
        let err =
            translate_exec_error("nonexistent-tool", io::Error::from_raw_os_error(libc::ENOENT));
        assert_eq!(err.exit_code(), 127);
        assert_eq!(
            err.with_hint(),
            "command not found: nonexistent-tool\nInstall missing executables first."
        );
    }

    #[test]
    fn test_translate_other_error_is_surfaced() {
        let err = translate_exec_error("tool", io::Error::from_raw_os_error(libc::E2BIG));
        assert!(matches!(err, Error::Exec { .. }));
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().starts_with("failed to execute tool: "));
    }
}
