// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Namespace Store
//!
//! Loads and saves whole user trees through a [`NamespaceRepository`]. A
//! user without a stored document gets a fresh root named `root`, which is
//! persisted before it is handed out.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Root-of-user resolution and durable persistence

use crate::domain::document::{NamespaceDocument, UserKey};
use crate::domain::namespace::{NamespaceError, NamespaceTree};
use crate::domain::repository::NamespaceRepository;
use std::sync::Arc;
use tracing::{error, info};

/// Tree returned by [`NamespaceStore::load_or_create`]
#[derive(Debug)]
pub struct LoadedTree {
    pub tree: NamespaceTree,
    /// True when no document existed and a new root was persisted
    pub created: bool,
}

#[derive(Clone)]
pub struct NamespaceStore {
    repository: Arc<dyn NamespaceRepository>,
}

impl NamespaceStore {
    pub fn new(repository: Arc<dyn NamespaceRepository>) -> Self {
        Self { repository }
    }

    pub async fn load_or_create(&self, user: &str) -> Result<LoadedTree, NamespaceError> {
        let key = UserKey::for_user(user);

        if let Some(document) = self.repository.load(&key).await? {
            let tree = document.into_tree(user)?;
            info!(user, key = %key, nodes = tree.node_count(), "Loaded namespace");
            return Ok(LoadedTree { tree, created: false });
        }

        let tree = NamespaceTree::new(user);
        self.save(&tree).await?;
        info!(user, key = %key, "Created namespace root");
        Ok(LoadedTree { tree, created: true })
    }

    /// Overwrite the stored document with the whole of `tree`
    pub async fn save(&self, tree: &NamespaceTree) -> Result<(), NamespaceError> {
        let key = UserKey::for_user(tree.user());
        let document = NamespaceDocument::from_tree(tree);

        self.repository.save(&key, &document).await.map_err(|e| {
            error!(user = tree.user(), key = %key, error = %e, "Failed to persist namespace");
            NamespaceError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::InMemoryNamespaceRepository;

    #[tokio::test]
    async fn test_creates_and_persists_empty_root() {
        let repository = InMemoryNamespaceRepository::new();
        let store = NamespaceStore::new(Arc::new(repository.clone()));

        let loaded = store.load_or_create("Juan").await.unwrap();
        assert!(loaded.created);
        assert_eq!(loaded.tree.root_node().name(), "root");
        assert_eq!(loaded.tree.node_count(), 1);
        assert_eq!(repository.len(), 1);

        let again = store.load_or_create("Juan").await.unwrap();
        assert!(!again.created);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let store = NamespaceStore::new(Arc::new(InMemoryNamespaceRepository::new()));
        let mut tree = store.load_or_create("Juan").await.unwrap().tree;
        let root = tree.root();
        let documents = tree.create_child(root, "Documents").unwrap();
        let reports = tree.create_child(documents, "Reports").unwrap();
        tree.link_file(reports, "q1.pdf", "blob-q1").unwrap();
        tree.link_file(root, "notes.txt", "blob-notes").unwrap();
        store.save(&tree).await.unwrap();

        let loaded = store.load_or_create("Juan").await.unwrap().tree;
        assert_eq!(
            NamespaceDocument::from_tree(&loaded),
            NamespaceDocument::from_tree(&tree)
        );
        let documents = loaded.child(loaded.root(), "Documents").unwrap();
        let reports = loaded.child(documents, "Reports").unwrap();
        assert_eq!(loaded.path(reports).unwrap(), "Documents/Reports");
        assert_eq!(loaded.blob_id(reports, "q1.pdf").unwrap(), "blob-q1");
    }

    #[tokio::test]
    async fn test_document_of_other_user_is_malformed() {
        let repository = InMemoryNamespaceRepository::new();
        let foreign = NamespaceDocument::from_tree(&NamespaceTree::new("David"));
        repository
            .save(&UserKey::for_user("Juan"), &foreign)
            .await
            .unwrap();
        let store = NamespaceStore::new(Arc::new(repository));

        let result = store.load_or_create("Juan").await;
        assert!(matches!(result, Err(NamespaceError::MalformedDocument(_))));
    }
}
