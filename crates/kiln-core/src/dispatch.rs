//! Command dispatch.
//!
//! Picks how an invocation runs:
//!
//! - resolved kiln script, loading allowed → [`InProcessLoader`]
//! - resolved anything else → [`ProcessReplacer`] with the resolved path
//! - unresolved → [`ProcessReplacer`] with the command as given, so the OS
//!   does its own `PATH` search

use crate::error::Error;
use crate::invocation::{ExecutionOutcome, Invocation};
use crate::loader::InProcessLoader;
use crate::replace::ProcessReplacer;
use crate::resolve::Resolver;
use crate::settings::Settings;
use crate::shebang::ShebangSniffer;
use crate::ui::UiHandle;

/// Chooses between in-process loading and process replacement.
pub struct CommandDispatcher {
    resolver: Box<dyn Resolver>,
    sniffer: ShebangSniffer,
    replacer: ProcessReplacer,
    loader: InProcessLoader,
}

impl CommandDispatcher {
    /// Dispatcher sniffing for the loader's own runtime.
    pub fn new(
        resolver: impl Resolver + 'static,
        replacer: ProcessReplacer,
        loader: InProcessLoader,
    ) -> Self {
        let sniffer = ShebangSniffer::for_runtime(loader.runtime());
        Self::with_sniffer(resolver, sniffer, replacer, loader)
    }

    pub fn with_sniffer(
        resolver: impl Resolver + 'static,
        sniffer: ShebangSniffer,
        replacer: ProcessReplacer,
        loader: InProcessLoader,
    ) -> Self {
        Self {
            resolver: Box::new(resolver),
            sniffer,
            replacer,
            loader,
        }
    }

    /// Run the invocation.
    ///
    /// When the process image is replaced this does not return.
    pub fn run(
        &self,
        invocation: &Invocation,
        ui: &UiHandle,
        settings: &mut Settings,
    ) -> ExecutionOutcome {
        let Some(command) = invocation.command() else {
            let err = Error::MissingCommand;
            ui.error(&err.to_string());
            return ExecutionOutcome::Failed {
                code: err.exit_code(),
                message: err.to_string(),
            };
        };

        let target = self.resolver.resolve(command);
        let args = invocation.args();

        match target.path {
            Some(path) if !settings.disable_exec_load && self.sniffer.matches(&path) => {
                tracing::debug!("Loading {} in-process", path.display());
                self.loader.load(command, &path, args, ui, settings)
            }
            Some(path) => {
                tracing::debug!("Replacing process with resolved {}", path.display());
                self.replacer.replace(command, path, args, ui)
            }
            None => {
                tracing::debug!("{} not found on PATH, leaving lookup to the OS", command);
                self.replacer.replace(command, command, args, ui)
            }
        }
    }
}
