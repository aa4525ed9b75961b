//! offload driver binary
//!
//! Exercises the library from the command line: runs demo batches, lists
//! the built-in services and manages the configuration file.

mod cli;
mod demo;

use clap::Parser;
use tracing::info;

use offload::config::{self, RunnerConfig};
use offload::logging::{self, LogGuards};
use offload::{Error, ExecutorRegistry, Result};

use crate::cli::{Cli, Commands, ConfigSubcommand};

fn main() {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    // For commands that don't need full logging, use simple setup
    if let Commands::Config { subcommand } = &cli.command {
        logging::init_simple(tracing::Level::WARN)?;
        return handle_config_command(subcommand.clone());
    }

    let config_path = match &cli.command {
        Commands::Demo(args) => args.config.clone(),
        Commands::Services { config } => config.clone(),
        Commands::Config { .. } => None,
    };

    let config = RunnerConfig::load(config_path.as_deref())?;

    // The guards must be kept alive for the lifetime of the program
    let _log_guards = init_logging_from_config(&config, cli.verbose, cli.quiet)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting offload");

    match cli.command {
        Commands::Demo(args) => {
            let report = demo::run_demo(&config, &args)?;
            report.print(args.json)?;
        }
        Commands::Services { .. } => {
            print_services(&config)?;
        }
        Commands::Config { .. } => {
            // Already handled above
            unreachable!();
        }
    }

    Ok(())
}

/// Initialize logging from configuration
fn init_logging_from_config(config: &RunnerConfig, verbose: u8, quiet: bool) -> Result<LogGuards> {
    logging::init_logging(&config.logging, verbose, quiet)
}

fn print_services(config: &RunnerConfig) -> Result<()> {
    let registry =
        ExecutorRegistry::with_presets(config.multi.pool_config(), config.single.pool_config())?;

    for name in registry.names() {
        let context = registry
            .get(&name)
            .ok_or_else(|| Error::Internal(format!("service '{}' vanished from registry", name)))?;
        let marker = if name == config.runner.default_service { "*" } else { " " };
        println!("{} {:<8} {}", marker, name, context.describe());
    }

    Ok(())
}

fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = RunnerConfig::load(config.as_deref())?;
            println!("{}", cfg.to_toml()?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration file created: {}", written.display());
        }
        ConfigSubcommand::Validate { config } => {
            RunnerConfig::load(config.as_deref())?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
