// doppel CLI - accuracy statistics for generated populations

mod accuracy;
mod exit_codes;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use accuracy::AccuracyCommands;
use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "doppel")]
#[command(about = "Score synthetic populations against PUMS and marginal control totals")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log per-row errors and progress (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Accuracy statistics (PUMS vs. generated population vs. marginals)
    Accuracy {
        #[command(subcommand)]
        command: AccuracyCommands,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  doppel-accuracy ", env!("CARGO_PKG_VERSION"),
    )
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Accuracy { command } => accuracy::cmd_accuracy(command, cli.verbose),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
