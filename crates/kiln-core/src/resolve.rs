//! Executable lookup on `PATH`.

use std::path::PathBuf;

use crate::invocation::ResolvedTarget;

/// Finds the executable a command name refers to.
pub trait Resolver {
    fn resolve(&self, command: &str) -> ResolvedTarget;
}

/// Resolver backed by the `which` crate, searching the current `PATH`.
///
/// Names containing a path separator are checked relative to the current
/// directory instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathResolver;

impl Resolver for PathResolver {
    fn resolve(&self, command: &str) -> ResolvedTarget {
        let path: Option<PathBuf> = which::which(command).ok();
        ResolvedTarget { path }
    }
}
