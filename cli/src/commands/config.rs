// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use icedrive_namespace_core::domain::service_config::{NamespaceServiceConfig, StorageBackendKind};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show {
        /// List the files checked during discovery
        #[arg(long)]
        paths: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Write a sample configuration
    Generate {
        #[arg(short, long, default_value = "namespace-config.yaml")]
        output: PathBuf,

        /// Annotated template with every setting explained
        #[arg(long)]
        examples: bool,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)).map(|_| ()),
        ConfigCommand::Generate {
            output,
            examples,
            force,
        } => generate(&output, examples, force),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    if show_paths {
        println!("{}", "Discovery order:".bold());
        let overridden = config_override.iter().map(|path| (path.clone(), "--config"));
        let discovered = NamespaceServiceConfig::config_candidates()
            .into_iter()
            .map(|path| (path, ""));
        for (index, (path, origin)) in overridden.chain(discovered).enumerate() {
            let marker = if path.is_file() { "found".green() } else { "missing".dimmed() };
            println!("  {}. {} [{}] {}", index + 1, path.display(), marker, origin.dimmed());
        }
        println!();
    }

    let config = NamespaceServiceConfig::load_or_default(config_override)
        .context("Failed to load configuration")?;
    print!("{}", describe(&config));
    Ok(())
}

fn describe(config: &NamespaceServiceConfig) -> String {
    let storage = match config.spec.storage.backend {
        StorageBackendKind::File => format!("file ({})", config.spec.storage.data_dir.display()),
        StorageBackendKind::Memory => "memory".to_string(),
    };

    [
        ("Instance", format!("{} ({})", config.metadata.name, config.spec.instance.id)),
        ("Storage", storage),
        ("Announce every", format!("{}s", config.spec.discovery.announce_interval_secs)),
        ("Collaborator timeout", format!("{}ms", config.spec.collaborators.timeout_ms)),
        ("Cached trees", config.spec.cache.max_trees.to_string()),
        ("Log level", config.spec.logging.level.clone()),
    ]
    .into_iter()
    .map(|(label, value)| format!("{:<22}{}\n", format!("{}:", label).bold(), value))
    .collect()
}

fn validate(config_path: Option<PathBuf>) -> Result<NamespaceServiceConfig> {
    let config = NamespaceServiceConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    println!("{} {}", "✓".green(), config.metadata.name);
    Ok(config)
}

fn generate(output: &Path, with_examples: bool, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{} already exists, pass --force to replace it", output.display());
    }
    std::fs::write(output, sample_config(with_examples))
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("{} {}", "✓ Wrote".green(), output.display());
    Ok(())
}

fn sample_config(with_examples: bool) -> &'static str {
    if with_examples {
        include_str!("../../templates/namespace-config-with-examples.yaml")
    } else {
        include_str!("../../templates/namespace-config-minimal.yaml")
    }
}
