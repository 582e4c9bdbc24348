// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Local Filesystem Namespace Repository
//!
//! Stores each user's namespace as `<data_dir>/<user key>.json`. Saves write
//! a uniquely named temporary file in the same directory, flush it to disk and
//! rename it over the target, so a crash mid-save leaves the previous
//! document in place.
//!
//! **Limitations:**
//! - Single node only; instances sharing a data directory do not coordinate
//! - Orphaned temporary files from a crash are not cleaned up

use crate::domain::document::{NamespaceDocument, UserKey};
use crate::domain::repository::{NamespaceRepository, RepositoryError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

pub struct FileNamespaceRepository {
    data_dir: PathBuf,
}

impl FileNamespaceRepository {
    /// Create the repository, creating `data_dir` if needed
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let data_dir = data_dir.into();

        std::fs::create_dir_all(&data_dir).map_err(|e| {
            RepositoryError::Unavailable(format!(
                "Failed to create data directory {}: {}",
                data_dir.display(),
                e
            ))
        })?;

        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the document stored under `key`
    pub fn document_path(&self, key: &UserKey) -> PathBuf {
        Self::path_in(&self.data_dir, key)
    }

    /// Path a repository rooted at `data_dir` uses for `key`
    pub fn path_in(data_dir: &Path, key: &UserKey) -> PathBuf {
        data_dir.join(format!("{}.json", key))
    }

    fn temp_path(&self, key: &UserKey) -> PathBuf {
        self.data_dir
            .join(format!(".{}.json.{}.tmp", key, uuid::Uuid::new_v4().simple()))
    }
}

#[async_trait]
impl NamespaceRepository for FileNamespaceRepository {
    async fn load(&self, key: &UserKey) -> Result<Option<NamespaceDocument>, RepositoryError> {
        let path = self.document_path(key);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RepositoryError::Io(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let document = serde_json::from_slice(&bytes).map_err(|e| {
            RepositoryError::Serialization(format!("{}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded namespace document");
        Ok(Some(document))
    }

    async fn save(&self, key: &UserKey, document: &NamespaceDocument) -> Result<(), RepositoryError> {
        let contents = serde_json::to_vec_pretty(document)?;
        let target = self.document_path(key);
        let temp = self.temp_path(key);

        let written = async {
            let mut file = tokio::fs::File::create(&temp).await?;
            file.write_all(&contents).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&temp, &target).await
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %temp.display(), error = %cleanup, "Failed to remove temporary document");
                }
            }
            return Err(RepositoryError::Io(format!(
                "Failed to write {}: {}",
                target.display(),
                e
            )));
        }

        debug!(path = %target.display(), bytes = contents.len(), "Saved namespace document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::namespace::NamespaceTree;
    use tempfile::TempDir;

    fn sample_document(user: &str) -> NamespaceDocument {
        let mut tree = NamespaceTree::new(user);
        let root = tree.root();
        let documents = tree.create_child(root, "Documents").unwrap();
        tree.link_file(documents, "cv.pdf", "blob-cv").unwrap();
        NamespaceDocument::from_tree(&tree)
    }

    #[tokio::test]
    async fn test_missing_document_loads_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let repository = FileNamespaceRepository::new(temp_dir.path()).unwrap();

        let loaded = repository.load(&UserKey::for_user("Juan")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let repository = FileNamespaceRepository::new(temp_dir.path()).unwrap();
        let key = UserKey::for_user("Juan");
        let document = sample_document("Juan");

        repository.save(&key, &document).await.unwrap();

        assert!(repository.document_path(&key).is_file());
        assert_eq!(repository.load(&key).await.unwrap(), Some(document));
    }

    #[tokio::test]
    async fn test_save_replaces_and_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let repository = FileNamespaceRepository::new(temp_dir.path()).unwrap();
        let key = UserKey::for_user("Juan");

        repository.save(&key, &sample_document("Juan")).await.unwrap();
        let empty = NamespaceDocument::from_tree(&NamespaceTree::new("Juan"));
        repository.save(&key, &empty).await.unwrap();

        assert_eq!(repository.load(&key).await.unwrap(), Some(empty));
        let entries: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_stored_format_omits_empty_maps() {
        let temp_dir = TempDir::new().unwrap();
        let repository = FileNamespaceRepository::new(temp_dir.path()).unwrap();
        let key = UserKey::for_user("Juan");

        repository.save(&key, &sample_document("Juan")).await.unwrap();

        let raw = std::fs::read_to_string(repository.document_path(&key)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["name"], "root");
        assert_eq!(value["childs"]["Documents"]["files"]["cv.pdf"], "blob-cv");
        assert!(value.get("files").is_none());
        assert!(value["childs"]["Documents"].get("childs").is_none());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let repository = FileNamespaceRepository::new(temp_dir.path()).unwrap();
        let key = UserKey::for_user("Juan");
        std::fs::write(repository.document_path(&key), b"{ not json").unwrap();

        let result = repository.load(&key).await;
        assert!(matches!(result, Err(RepositoryError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let key = UserKey::for_user("David");
        let document = sample_document("David");

        FileNamespaceRepository::new(temp_dir.path())
            .unwrap()
            .save(&key, &document)
            .await
            .unwrap();

        let reopened = FileNamespaceRepository::new(temp_dir.path()).unwrap();
        assert_eq!(reopened.load(&key).await.unwrap(), Some(document));
    }
}
