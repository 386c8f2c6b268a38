//! kiln-script - standalone interpreter for kiln scripts.
//!
//! This is what `#!/usr/bin/env kiln-script` runs when kiln replaces itself
//! with a script instead of loading it.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use kiln_core::{
    CommandScript, DylibRuntime, ScriptContext, ScriptError, ScriptRuntime, Settings,
};

#[derive(Parser)]
#[command(name = "kiln-script")]
#[command(about = "Run a kiln script")]
#[command(version)]
struct Cli {
    /// Path to the script
    script: PathBuf,

    /// Arguments passed to the script
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", err.with_hint());
            err.exit_code()
        }
    };

    std::io::stdout().flush().ok();
    std::process::exit(code);
}

fn run(cli: Cli) -> kiln_core::Result<i32> {
    let settings = Settings::load()?;
    let runtime: Box<dyn ScriptRuntime> = match &settings.runtime_library {
        Some(library) => Box::new(DylibRuntime::new(library)),
        None => Box::new(CommandScript::new()),
    };

    let ctx = ScriptContext {
        program: cli.script,
        argv: cli.args,
    };

    let code = match runtime.run(&ctx) {
        Ok(()) => 0,
        Err(ScriptError::Exit(code)) => code,
        Err(ScriptError::Failure(failure)) => {
            eprintln!("{}: {}", ctx.program.display(), failure);
            for frame in &failure.backtrace {
                eprintln!("  {frame}");
            }
            kiln_core::error::EXIT_GENERIC
        }
    };
    Ok(code)
}
