//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for the offload driver.

use clap::{Parser, Subcommand};

/// offload - background execution with main-context delivery
///
/// Runs work on a named background service and delivers every result on
/// the process main thread.
#[derive(Parser, Debug)]
#[command(name = "offload")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a batch of tasks and report where their callbacks ran
    Demo(DemoArgs),

    /// List the built-in services and their pool settings
    Services {
        /// Path to configuration file
        #[arg(short, long, env = "OFFLOAD_CONFIG")]
        config: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Options for the demo command
#[derive(clap::Args, Debug, Clone)]
pub struct DemoArgs {
    /// Path to configuration file
    #[arg(short, long, env = "OFFLOAD_CONFIG")]
    pub config: Option<String>,

    /// Service to run on (overrides runner.default_service)
    #[arg(short, long)]
    pub service: Option<String>,

    /// Number of tasks to submit
    #[arg(short, long, default_value = "20")]
    pub tasks: u32,

    /// Simulated work per task in milliseconds
    #[arg(long, default_value = "10")]
    pub work_ms: u64,

    /// Make every Nth task fail (0 = never)
    #[arg(long, default_value = "0")]
    pub fail_every: u32,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}
