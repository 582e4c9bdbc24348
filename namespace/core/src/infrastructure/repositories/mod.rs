// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the `NamespaceRepository` abstraction
//! defined in the domain layer, following the Repository pattern from DDD.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve per-user namespace documents
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **FileNamespaceRepository** - one JSON document per user on local disk,
//!   replaced atomically on every save
//! - **InMemoryNamespaceRepository** - thread-safe HashMap-backed storage for
//!   tests and throwaway instances
//!
//! # Usage
//!
//! ```no_run
//! use icedrive_namespace_core::infrastructure::repositories::create_repository;
//! use icedrive_namespace_core::domain::repository::StorageBackend;
//!
//! let repository = create_repository(StorageBackend::File {
//!     data_dir: "./USRDIRS".into(),
//! })?;
//! # Ok::<(), icedrive_namespace_core::domain::repository::RepositoryError>(())
//! ```

pub mod file;

pub use file::FileNamespaceRepository;

use crate::domain::document::{NamespaceDocument, UserKey};
use crate::domain::repository::{NamespaceRepository, RepositoryError, StorageBackend};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory function to create a repository from configuration
pub fn create_repository(backend: StorageBackend) -> Result<Arc<dyn NamespaceRepository>, RepositoryError> {
    match backend {
        StorageBackend::InMemory => Ok(Arc::new(InMemoryNamespaceRepository::new())),
        StorageBackend::File { data_dir } => Ok(Arc::new(FileNamespaceRepository::new(data_dir)?)),
    }
}

#[derive(Clone, Default)]
pub struct InMemoryNamespaceRepository {
    documents: Arc<RwLock<HashMap<UserKey, NamespaceDocument>>>,
}

impl InMemoryNamespaceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait]
impl NamespaceRepository for InMemoryNamespaceRepository {
    async fn load(&self, key: &UserKey) -> Result<Option<NamespaceDocument>, RepositoryError> {
        Ok(self.documents.read().get(key).cloned())
    }

    async fn save(&self, key: &UserKey, document: &NamespaceDocument) -> Result<(), RepositoryError> {
        self.documents.write().insert(*key, document.clone());
        Ok(())
    }
}
