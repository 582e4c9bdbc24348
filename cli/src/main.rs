// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0

//! # IceDrive Namespace CLI
//!
//! The `icedrive-namespace` binary manages namespace service configuration
//! and inspects the namespaces a service instance has persisted.
//!
//! ## Commands
//!
//! - `icedrive-namespace config show|validate|generate` - Configuration management
//! - `icedrive-namespace tree <user>` - Print a user's persisted namespace
//! - `icedrive-namespace key <user>` - Print the storage key of a user

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use icedrive_namespace_cli::commands::{self, ConfigCommand};

/// IceDrive namespace service tooling
#[derive(Parser)]
#[command(name = "icedrive-namespace")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "ICEDRIVE_NAMESPACE_CONFIG",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "ICEDRIVE_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Print the persisted namespace of a user
    #[command(name = "tree")]
    Tree {
        /// User whose namespace to print
        user: String,

        /// Print the raw stored document instead of a tree
        #[arg(long)]
        json: bool,
    },

    /// Print the storage key and document path of a user
    #[command(name = "key")]
    Key {
        /// User name
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Tree { user, json }) => {
            commands::inspect::tree(&user, json, cli.config).await
        }
        Some(Commands::Key { user }) => commands::inspect::key(&user, cli.config),
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
