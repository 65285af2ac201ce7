//! pubcid CLI.
//!
//! Emulates page loads against a saved browser state:
//! - Decorating a bid request with the publisher common id
//! - Validating configuration files
//! - Setting or clearing the opt-out marker

use clap::{Parser, Subcommand};
use log::LevelFilter;
use pubcid_common::clock::SystemClock;
use std::path::PathBuf;
use std::sync::Arc;

mod config;
mod decorate;
mod error;
mod logging;
mod state;

use error::CliError;

#[derive(Parser)]
#[command(name = "pubcid")]
#[command(about = "Publisher common id for bid requests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the request-bids hooks over a bid request
    Decorate {
        /// Path to the bid request JSON
        #[arg(long, short)]
        request: PathBuf,

        /// Browser state file, created when missing
        #[arg(long, short, env = "PUBCID_STATE")]
        state: PathBuf,

        /// Path to the TOML configuration file
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Write the decorated request here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the TOML configuration file
        #[arg(long, short)]
        config: PathBuf,
    },

    /// Set the opt-out marker in the browser state
    OptOut {
        /// Browser state file, created when missing
        #[arg(long, short, env = "PUBCID_STATE")]
        state: PathBuf,

        /// Remove the marker instead
        #[arg(long)]
        clear: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let verbose_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    match cli.command {
        Commands::Decorate {
            request,
            state,
            config,
            output,
        } => {
            let settings = config::load_settings(config.as_ref())?;
            logging::init_logger(verbose_level.max(settings.log_level()))?;
            decorate::run(request, state, &settings, output)
        }
        Commands::Validate { config } => config::validate(config, cli.verbose),
        Commands::OptOut { state, clear } => {
            logging::init_logger(verbose_level)?;
            decorate::opt_out(&state, clear, Arc::new(SystemClock))
        }
    }
}
