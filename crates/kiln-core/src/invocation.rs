//! Data model shared by the dispatcher and both execution strategies.

use std::path::PathBuf;

/// Options carried as a trailing marker in an argument list.
///
/// The marker is not an argument of the target command. The replacer
/// applies it to the `exec` call; the loader drops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecOptions {
    /// Close every inherited descriptor above stderr in the new image.
    pub close_others: bool,
}

/// One element of an invocation's argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// A positional argument passed through to the target.
    Value(String),
    /// A configuration marker.
    Options(ExecOptions),
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Value(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Value(value)
    }
}

/// Split off one trailing configuration marker, if present.
pub fn split_trailing_marker(args: &[Arg]) -> (&[Arg], Option<ExecOptions>) {
    match args.split_last() {
        Some((Arg::Options(options), rest)) => (rest, Some(*options)),
        _ => (args, None),
    }
}

/// Positional values of an argument list, skipping any markers.
pub fn positional(args: &[Arg]) -> Vec<String> {
    args.iter()
        .filter_map(|arg| match arg {
            Arg::Value(value) => Some(value.clone()),
            Arg::Options(_) => None,
        })
        .collect()
}

/// A request to run one command, built by the CLI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    command: Option<String>,
    args: Vec<Arg>,
    close_extra_descriptors: bool,
}

impl Invocation {
    /// Build an invocation.
    ///
    /// When `close_extra_descriptors` is set, a trailing
    /// [`Arg::Options`] marker requesting it is appended to `args`.
    pub fn new<I, S>(command: Option<String>, args: I, close_extra_descriptors: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args: Vec<Arg> = args.into_iter().map(|a| Arg::Value(a.into())).collect();
        if close_extra_descriptors {
            args.push(Arg::Options(ExecOptions { close_others: true }));
        }

        Self {
            command,
            args,
            close_extra_descriptors,
        }
    }

    /// The command token, `None` when absent or empty.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref().filter(|c| !c.is_empty())
    }

    /// Arguments, including any trailing marker.
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn close_extra_descriptors(&self) -> bool {
        self.close_extra_descriptors
    }
}

/// Result of looking the command up on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedTarget {
    pub path: Option<PathBuf>,
}

/// What happened to an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The process image was replaced.
    ///
    /// A real `exec` never returns, so this is only observed when
    /// replacement is emulated by spawning and waiting.
    Replaced { exit_code: i32 },
    /// A script ran in this process and completed or exited on purpose.
    Loaded { exit_code: i32 },
    /// Nothing ran; the message was already reported to the UI.
    Failed { code: i32, message: String },
}

impl ExecutionOutcome {
    /// Exit code the dispatching process should terminate with.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecutionOutcome::Replaced { exit_code } | ExecutionOutcome::Loaded { exit_code } => {
                *exit_code
            }
            ExecutionOutcome::Failed { code, .. } => *code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_is_absent() {
        let inv = Invocation::new(Some(String::new()), Vec::<String>::new(), false);
        assert_eq!(inv.command(), None);
    }

    #[test]
    fn test_marker_appended_when_closing_descriptors() {
        let inv = Invocation::new(Some("rspec".into()), ["-v"], true);
        assert_eq!(
            inv.args(),
            &[
                Arg::from("-v"),
                Arg::Options(ExecOptions { close_others: true })
            ]
        );
        assert!(inv.close_extra_descriptors());
    }

    #[test]
    fn test_split_trailing_marker() {
        let args = vec![Arg::from("a"), Arg::Options(ExecOptions::default())];
        let (rest, marker) = split_trailing_marker(&args);
        assert_eq!(rest, &[Arg::from("a")]);
        assert_eq!(marker, Some(ExecOptions::default()));

        let plain = vec![Arg::from("a")];
        let (rest, marker) = split_trailing_marker(&plain);
        assert_eq!(rest.len(), 1);
        assert!(marker.is_none());
    }

    #[test]
    fn test_only_one_marker_is_split() {
        let args = vec![
            Arg::Options(ExecOptions::default()),
            Arg::Options(ExecOptions { close_others: true }),
        ];
        let (rest, marker) = split_trailing_marker(&args);
        assert_eq!(rest, &[Arg::Options(ExecOptions::default())]);
        assert_eq!(marker, Some(ExecOptions { close_others: true }));
    }
}
