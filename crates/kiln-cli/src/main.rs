//! kiln CLI - run commands inside a configured environment.

mod exec;

use std::io::Write;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Run commands inside a configured environment")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command in the configured environment
    Exec {
        /// Let the command inherit every open file descriptor
        #[arg(long)]
        keep_file_descriptors: bool,

        /// Command to run, followed by its arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,
    },

    /// Print the resolved settings
    Settings,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            // kiln-core errors carry their own exit code and recovery hint
            match err.downcast_ref::<kiln_core::Error>() {
                Some(kiln_err) => {
                    eprintln!("{}", kiln_err.with_hint());
                    kiln_err.exit_code()
                }
                None => {
                    eprintln!("{err:#}");
                    kiln_core::error::EXIT_GENERIC
                }
            }
        }
    };

    std::io::stdout().flush().ok();
    std::process::exit(code);
}

fn run(command: Commands) -> anyhow::Result<i32> {
    match command {
        Commands::Exec {
            keep_file_descriptors,
            argv,
        } => exec::execute(argv, keep_file_descriptors),

        Commands::Settings => {
            let settings = kiln_core::Settings::load()?;
            print!("{}", settings.to_toml()?);
            Ok(0)
        }
    }
}
