// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Offline namespace inspection
//!
//! Reads documents straight from the configured storage backend. Nothing is
//! created or modified, and no authenticator is consulted.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::debug;

use icedrive_namespace_core::domain::document::UserKey;
use icedrive_namespace_core::domain::namespace::{NamespaceTree, NodeId};
use icedrive_namespace_core::domain::repository::{NamespaceRepository, StorageBackend};
use icedrive_namespace_core::domain::service_config::NamespaceServiceConfig;
use icedrive_namespace_core::infrastructure::repositories::FileNamespaceRepository;

fn load_config(config_override: Option<PathBuf>) -> Result<NamespaceServiceConfig> {
    let config = NamespaceServiceConfig::load_or_default(config_override)
        .context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

pub async fn tree(user: &str, raw: bool, config_override: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_override)?;
    let StorageBackend::File { data_dir } = config.storage_backend() else {
        bail!("The memory storage backend keeps nothing to inspect");
    };
    if !data_dir.is_dir() {
        bail!("Data directory {} does not exist", data_dir.display());
    }

    let repository = FileNamespaceRepository::new(data_dir).context("Failed to open storage backend")?;
    let key = UserKey::for_user(user);
    debug!(user, key = %key, data_dir = %repository.data_dir().display(), "Loading namespace document");
    let Some(document) = repository
        .load(&key)
        .await
        .with_context(|| format!("Failed to load namespace of '{}'", user))?
    else {
        println!("{}", format!("No namespace stored for '{}'", user).yellow());
        return Ok(());
    };

    if raw {
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    let tree = document
        .into_tree(user)
        .with_context(|| format!("Stored namespace of '{}' is malformed", user))?;
    println!("{} {}", user.bold(), format!("({})", key).dimmed());
    print!("{}", render_tree(&tree)?);
    Ok(())
}

pub fn key(user: &str, config_override: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_override)?;
    let key = UserKey::for_user(user);

    println!("{}", key);
    if let StorageBackend::File { data_dir } = config.storage_backend() {
        let path = FileNamespaceRepository::path_in(&data_dir, &key);
        println!("{}", path.display().to_string().dimmed());
    }
    Ok(())
}

/// Render `tree` as an indented listing, directories before files
pub fn render_tree(tree: &NamespaceTree) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "/")?;
    render_node(tree, tree.root(), "", &mut out)?;
    Ok(out)
}

fn render_node(tree: &NamespaceTree, node: NodeId, prefix: &str, out: &mut String) -> Result<()> {
    let children = tree.children(node)?;
    let files = tree.files(node)?;
    let total = children.len() + files.len();

    for (index, name) in children.iter().enumerate() {
        let last = index + 1 == total;
        writeln!(out, "{}{}{}/", prefix, branch(last), name)?;
        let nested = format!("{}{}", prefix, if last { "    " } else { "│   " });
        render_node(tree, tree.child(node, name)?, &nested, out)?;
    }

    for (index, filename) in files.iter().enumerate() {
        let last = children.len() + index + 1 == total;
        let blob_id = tree.blob_id(node, filename)?;
        writeln!(out, "{}{}{} -> {}", prefix, branch(last), filename, blob_id)?;
    }

    Ok(())
}

fn branch(last: bool) -> &'static str {
    if last {
        "└── "
    } else {
        "├── "
    }
}
