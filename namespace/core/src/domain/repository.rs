// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interface
//!
//! Persistence contract for the namespace aggregate: one document per user,
//! addressed by [`UserKey`]. The interface lives in the domain layer and is
//! implemented in `crate::infrastructure::repositories`.
//!
//! | Implementation | Backing |
//! |----------------|---------|
//! | `InMemoryNamespaceRepository` | process memory (tests, ephemeral nodes) |
//! | `FileNamespaceRepository` | one JSON file per user, atomic replace |
//!
//! `save` must replace the stored document atomically: a reader sees either
//! the previous document or the new one, never a partial write.

use crate::domain::document::{NamespaceDocument, UserKey};
use async_trait::async_trait;

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    InMemory,
    File { data_dir: std::path::PathBuf },
}

/// Repository interface for namespace documents
#[async_trait]
pub trait NamespaceRepository: Send + Sync {
    /// Load the document stored under `key`, if any
    async fn load(&self, key: &UserKey) -> Result<Option<NamespaceDocument>, RepositoryError>;

    /// Create or replace the document stored under `key`
    async fn save(&self, key: &UserKey, document: &NamespaceDocument) -> Result<(), RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        RepositoryError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
