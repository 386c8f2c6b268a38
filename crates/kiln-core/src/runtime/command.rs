//! Built-in interpreter for kiln scripts.
//!
//! A kiln script is line oriented:
//!
//! ```text
//! #!/usr/bin/env kiln-script
//! # comments and blank lines are skipped
//! export RAILS_ENV=test
//! cd spec
//! rspec "$1" $@
//! exit 3
//! ```
//!
//! Words are split on whitespace; `'...'` is literal and `"..."` expands
//! `$0`..`$9`. An unquoted `$@` expands to one word per argument, a quoted
//! one to a single word. `exit`, `cd` and `export` are builtins; every
//! other line runs an external command with inherited stdio and fails the
//! script if it cannot be spawned or exits unsuccessfully.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fs;
use std::iter::Peekable;
use std::path::PathBuf;
use std::process::Command;
use std::str::Chars;

use super::{SCRIPT_INTERPRETER, ScriptContext, ScriptError, ScriptFailure, ScriptRuntime};

/// The built-in kiln script runtime.
#[derive(Debug, Clone, Default)]
pub struct CommandScript {
    interpreter: Option<PathBuf>,
}

impl CommandScript {
    /// Runtime whose standalone interpreter sits next to the current
    /// executable.
    pub fn new() -> Self {
        Self {
            interpreter: super::sibling_interpreter(),
        }
    }

    pub fn with_interpreter(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: Some(interpreter.into()),
        }
    }

    fn execute(
        &self,
        ctx: &ScriptContext,
        line: usize,
        words: &[String],
    ) -> Result<(), ScriptError> {
        let (command, args) = match words.split_first() {
            Some(split) => split,
            None => return Ok(()),
        };

        match command.as_str() {
            "exit" => {
                let code = match args.first() {
                    Some(code) => code.parse::<i32>().map_err(|_| {
                        failure(
                            ctx,
                            line,
                            command,
                            "SyntaxError",
                            format!("exit code must be an integer, got '{code}'"),
                        )
                    })?,
                    None => 0,
                };
                Err(ScriptError::Exit(code))
            }
            "cd" => {
                let dir = match args.first() {
                    Some(dir) => PathBuf::from(dir),
                    None => dirs::home_dir().ok_or_else(|| {
                        failure(
                            ctx,
                            line,
                            command,
                            "ArgumentError",
                            "no home directory to change to",
                        )
                    })?,
                };
                std::env::set_current_dir(&dir).map_err(|e| {
                    failure(ctx, line, command, io_class(&e), format!("{}: {}", dir.display(), e))
                })?;
                Ok(())
            }
            "export" => {
                for assignment in args {
                    let (name, value) = assignment
                        .split_once('=')
                        .filter(|(name, _)| !name.is_empty())
                        .ok_or_else(|| {
                            failure(
                                ctx,
                                line,
                                command,
                                "SyntaxError",
                                format!("expected NAME=VALUE, got '{assignment}'"),
                            )
                        })?;
                    // SAFETY: scripts run on the dispatching thread; kiln
                    // starts no other threads that read the environment.
                    unsafe { std::env::set_var(name, value) };
                }
                Ok(())
            }
            _ => {
                let status = Command::new(command).args(args).status().map_err(|e| {
                    failure(ctx, line, command, io_class(&e), format!("{command}: {e}"))
                })?;

                if status.success() {
                    return Ok(());
                }

                let message = match status.code() {
                    Some(code) => format!("`{command}` exited with status {code}"),
                    None => format!("`{command}` was terminated by a signal"),
                };
                Err(failure(ctx, line, command, "CommandFailed", message))
            }
        }
    }
}

impl ScriptRuntime for CommandScript {
    fn names(&self) -> Vec<String> {
        vec![SCRIPT_INTERPRETER.to_string()]
    }

    fn interpreter_path(&self) -> Option<PathBuf> {
        self.interpreter.clone()
    }

    fn run(&self, ctx: &ScriptContext) -> Result<(), ScriptError> {
        let source = fs::read_to_string(&ctx.program).map_err(|e| {
            ScriptFailure::new(io_class(&e), format!("{}: {}", ctx.program.display(), e))
                .with_backtrace(host_frames())
        })?;

        for (index, raw) in source.lines().enumerate() {
            if index == 0 && raw.starts_with("#!") {
                continue;
            }

            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }

            let line = index + 1;
            let words = split_words(text, ctx)
                .map_err(|message| failure(ctx, line, text, "SyntaxError", message))?;
            self.execute(ctx, line, &words)?;
        }

        Ok(())
    }
}

/// Failure raised at `line` of the running script.
fn failure(
    ctx: &ScriptContext,
    line: usize,
    command: &str,
    class: impl Into<String>,
    message: impl Into<String>,
) -> ScriptError {
    let mut backtrace = vec![format!("{}:{}:in '{}'", ctx.program.display(), line, command)];
    backtrace.extend(host_frames());
    ScriptError::Failure(ScriptFailure::new(class, message).with_backtrace(backtrace))
}

fn io_class(err: &std::io::Error) -> String {
    format!("{:?}", err.kind())
}

/// Host frames above the interpreter, when backtraces are enabled through
/// `RUST_BACKTRACE`.
fn host_frames() -> Vec<String> {
    let backtrace = Backtrace::capture();
    if backtrace.status() != BacktraceStatus::Captured {
        return Vec::new();
    }

    callers(parse_frames(&backtrace.to_string()))
}

/// Drop the capture machinery and the interpreter's own frames: everything
/// up to and including the outermost frame of this module.
fn callers(frames: Vec<String>) -> Vec<String> {
    let own = module_path!();
    match frames.iter().rposition(|frame| frame.contains(own)) {
        Some(last) => frames.into_iter().skip(last + 1).collect(),
        None => frames,
    }
}

/// One entry per frame of a rendered `std::backtrace::Backtrace`, with its
/// source location appended.
fn parse_frames(rendered: &str) -> Vec<String> {
    let mut frames: Vec<String> = Vec::new();
    for line in rendered.lines() {
        let line = line.trim();
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(last) = frames.last_mut() {
                last.push_str(" at ");
                last.push_str(location);
            }
        } else if let Some((index, symbol)) = line.split_once(": ")
            && index.chars().all(|c| c.is_ascii_digit())
        {
            frames.push(symbol.to_string());
        }
    }
    frames
}

/// Split a script line into words, expanding positional parameters.
fn split_words(line: &str, ctx: &ScriptContext) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err("unterminated single quote".to_string()),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('$') => expand_parameter(&mut chars, &mut current, ctx),
                        Some(c) => current.push(c),
                        None => return Err("unterminated double quote".to_string()),
                    }
                }
            }
            '$' if chars.peek() == Some(&'@') => {
                chars.next();
                let word_ends = chars.peek().is_none_or(|c| c.is_whitespace());
                if !in_word && word_ends {
                    words.extend(ctx.argv.iter().cloned());
                } else {
                    current.push_str(&ctx.argv.join(" "));
                    in_word = true;
                }
            }
            '$' => {
                // An unset parameter outside quotes produces no word
                let before = current.len();
                expand_parameter(&mut chars, &mut current, ctx);
                in_word |= current.len() > before;
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn expand_parameter(chars: &mut Peekable<Chars<'_>>, out: &mut String, ctx: &ScriptContext) {
    if chars.peek() == Some(&'@') {
        chars.next();
        out.push_str(&ctx.argv.join(" "));
        return;
    }

    let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) else {
        out.push('$');
        return;
    };
    chars.next();

    if digit == 0 {
        out.push_str(&ctx.program.display().to_string());
    } else if let Some(arg) = ctx.argv.get(digit as usize - 1) {
        out.push_str(arg);
    }
}
