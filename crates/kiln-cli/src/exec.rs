//! Exec command implementation for kiln CLI.
//!
//! Builds the invocation from the command line and hands it to the
//! dispatcher. On the replacement path this never returns.

use std::io::IsTerminal;

use kiln_core::{
    CommandDispatcher, CommandScript, DylibRuntime, InProcessLoader, Invocation, PathResolver,
    ProcessReplacer, Settings, SharedPathEnvironment, Shell, SystemExec, SystemSignals, UiHandle,
};

/// Run `argv` and return the exit code kiln should terminate with.
pub fn execute(argv: Vec<String>, keep_file_descriptors: bool) -> anyhow::Result<i32> {
    let mut settings = Settings::load()?;
    let ui = UiHandle::new(Shell::new(std::io::stderr().is_terminal()));

    let mut argv = argv.into_iter();
    let invocation = Invocation::new(argv.next(), argv, !keep_file_descriptors);

    let dispatcher = dispatcher(&settings);
    let outcome = dispatcher.run(&invocation, &ui, &mut settings);
    tracing::debug!("Outcome: {:?}", outcome);

    Ok(outcome.exit_code())
}

fn dispatcher(settings: &Settings) -> CommandDispatcher {
    let loader = match &settings.runtime_library {
        Some(library) => InProcessLoader::new(
            DylibRuntime::new(library),
            SharedPathEnvironment,
            SystemSignals,
        ),
        None => InProcessLoader::new(CommandScript::new(), SharedPathEnvironment, SystemSignals),
    };

    CommandDispatcher::new(PathResolver, ProcessReplacer::new(SystemExec), loader)
}
