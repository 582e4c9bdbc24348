// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Namespace Tree Aggregate
//!
//! One user's directory hierarchy. Nodes live in an arena owned by
//! [`NamespaceTree`] and refer to each other by [`NodeId`]: a node's
//! `children` map holds ids, and its `parent` is a plain id used for path
//! reconstruction and ascent. Detaching a child drops the whole subtree
//! from the arena.
//!
//! All operations here are tree-local and synchronous. Persistence,
//! authorization and blob-service calls are layered on top by
//! `application::namespace_service`.
//!
//! # Invariants
//!
//! - exactly one root (no parent) per tree, and the tree is acyclic
//! - sibling directory names are unique, as are filenames within a node
//! - every non-root node appears in exactly one parent's `children`
//! - depth never exceeds [`MAX_TREE_DEPTH`]
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements the namespace node model and its CRUD rules

use crate::domain::discovery::ServiceKind;
use crate::domain::document::DocumentError;
use crate::domain::repository::RepositoryError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

/// Name given to a freshly created root
pub const ROOT_NAME: &str = "root";

/// Maximum number of levels below the root
///
/// Documents nest two JSON levels per tree level, so this keeps any
/// persisted tree inside the parser's recursion limit.
pub const MAX_TREE_DEPTH: usize = 48;

/// Arena index of a node, stable for the lifetime of the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Namespace errors surfaced to callers
#[derive(Debug, Error)]
pub enum NamespaceError {
    #[error("Child directory '{name}' does not exist in '/{path}'")]
    ChildNotFound { name: String, path: String },

    #[error("Child directory '{name}' already exists in '/{path}'")]
    ChildAlreadyExists { name: String, path: String },

    #[error("File '{filename}' not found in '/{path}'")]
    FileNotFound { filename: String, path: String },

    #[error("File '{filename}' already exists in '/{path}'")]
    FileAlreadyExists { filename: String, path: String },

    #[error("Root directory has no parent")]
    RootHasNoParent,

    #[error("User '{user}' is not authorized")]
    Unauthorized { user: String },

    #[error("No {0} service available")]
    ServiceUnavailable(ServiceKind),

    #[error("Blob service does not know blob '{blob_id}'")]
    UnknownBlob { blob_id: String },

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Directory '/{path}' is at the maximum depth of {max}")]
    DepthLimitExceeded { path: String, max: usize },

    #[error("Directory {node} no longer exists")]
    NodeRemoved { node: NodeId },

    #[error("Malformed namespace document: {0}")]
    MalformedDocument(String),

    #[error("Persistence failure: {0}")]
    Persistence(RepositoryError),
}

impl From<RepositoryError> for NamespaceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Serialization(msg) => NamespaceError::MalformedDocument(msg),
            other => NamespaceError::Persistence(other),
        }
    }
}

impl From<DocumentError> for NamespaceError {
    fn from(err: DocumentError) -> Self {
        NamespaceError::MalformedDocument(err.to_string())
    }
}

/// Check a directory or file name
///
/// Names are single path segments: non-empty, no `/`, and not `.`/`..`.
pub fn validate_name(name: &str) -> Result<(), NamespaceError> {
    if name.is_empty() {
        return Err(NamespaceError::InvalidName("name must not be empty".to_string()));
    }
    if name.contains('/') {
        return Err(NamespaceError::InvalidName(format!("'{}' contains '/'", name)));
    }
    if name == "." || name == ".." {
        return Err(NamespaceError::InvalidName(format!("'{}' is reserved", name)));
    }
    Ok(())
}

/// A single directory in the arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceNode {
    name: String,
    parent: Option<NodeId>,
    children: HashMap<String, NodeId>,
    files: HashMap<String, String>,
}

impl NamespaceNode {
    fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            parent,
            children: HashMap::new(),
            files: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn children(&self) -> &HashMap<String, NodeId> {
        &self.children
    }

    pub fn files(&self) -> &HashMap<String, String> {
        &self.files
    }
}

/// Arena holding one user's whole namespace
#[derive(Debug, Clone)]
pub struct NamespaceTree {
    user: String,
    root: NodeId,
    nodes: HashMap<NodeId, NamespaceNode>,
    next_id: u64,
}

impl NamespaceTree {
    /// Empty tree with a root named [`ROOT_NAME`]
    pub fn new(user: impl Into<String>) -> Self {
        Self::with_root_name(user, ROOT_NAME)
    }

    pub(crate) fn with_root_name(user: impl Into<String>, root_name: impl Into<String>) -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, NamespaceNode::new(root_name.into(), None));
        Self {
            user: user.into(),
            root,
            nodes,
            next_id: 1,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of directories, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn root_node(&self) -> &NamespaceNode {
        // the root is never detached
        &self.nodes[&self.root]
    }

    pub fn get(&self, id: NodeId) -> Option<&NamespaceNode> {
        self.nodes.get(&id)
    }

    pub fn node(&self, id: NodeId) -> Result<&NamespaceNode, NamespaceError> {
        self.nodes.get(&id).ok_or(NamespaceError::NodeRemoved { node: id })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NamespaceNode, NamespaceError> {
        self.nodes.get_mut(&id).ok_or(NamespaceError::NodeRemoved { node: id })
    }

    pub fn parent(&self, id: NodeId) -> Result<NodeId, NamespaceError> {
        self.node(id)?.parent.ok_or(NamespaceError::RootHasNoParent)
    }

    pub fn children(&self, id: NodeId) -> Result<BTreeSet<String>, NamespaceError> {
        Ok(self.node(id)?.children.keys().cloned().collect())
    }

    pub fn child(&self, id: NodeId, name: &str) -> Result<NodeId, NamespaceError> {
        let node = self.node(id)?;
        match node.children.get(name) {
            Some(child) => Ok(*child),
            None => Err(NamespaceError::ChildNotFound {
                name: name.to_string(),
                path: self.path(id)?,
            }),
        }
    }

    pub fn create_child(&mut self, id: NodeId, name: &str) -> Result<NodeId, NamespaceError> {
        validate_name(name)?;
        if self.node(id)?.children.contains_key(name) {
            return Err(NamespaceError::ChildAlreadyExists {
                name: name.to_string(),
                path: self.path(id)?,
            });
        }
        if self.depth(id)? >= MAX_TREE_DEPTH {
            return Err(NamespaceError::DepthLimitExceeded {
                path: self.path(id)?,
                max: MAX_TREE_DEPTH,
            });
        }
        Ok(self.attach(id, name.to_string()))
    }

    /// Insert a new empty node under `parent` without any checks
    pub(crate) fn attach(&mut self, parent: NodeId, name: String) -> NodeId {
        let child = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(child, NamespaceNode::new(name.clone(), Some(parent)));
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.insert(name, child);
        }
        child
    }

    /// Detach and discard the child subtree named `name`
    pub fn remove_child(&mut self, id: NodeId, name: &str) -> Result<(), NamespaceError> {
        let child = self.child(id, name)?;
        self.node_mut(id)?.children.remove(name);

        let mut pending = vec![child];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                pending.extend(node.children.into_values());
            }
        }
        Ok(())
    }

    /// Blob ids linked anywhere in the subtree rooted at `id`, one per file
    pub fn subtree_blob_ids(&self, id: NodeId) -> Result<Vec<String>, NamespaceError> {
        let mut blob_ids = Vec::new();
        let mut pending = vec![self.node(id)?];
        while let Some(node) = pending.pop() {
            blob_ids.extend(node.files.values().cloned());
            pending.extend(node.children.values().filter_map(|child| self.nodes.get(child)));
        }
        Ok(blob_ids)
    }

    pub fn files(&self, id: NodeId) -> Result<BTreeSet<String>, NamespaceError> {
        Ok(self.node(id)?.files.keys().cloned().collect())
    }

    pub fn blob_id(&self, id: NodeId, filename: &str) -> Result<String, NamespaceError> {
        let node = self.node(id)?;
        match node.files.get(filename) {
            Some(blob_id) => Ok(blob_id.clone()),
            None => Err(NamespaceError::FileNotFound {
                filename: filename.to_string(),
                path: self.path(id)?,
            }),
        }
    }

    /// Fail with `FileAlreadyExists` if `filename` is linked in `id`
    pub fn ensure_file_absent(&self, id: NodeId, filename: &str) -> Result<(), NamespaceError> {
        validate_name(filename)?;
        if self.node(id)?.files.contains_key(filename) {
            return Err(NamespaceError::FileAlreadyExists {
                filename: filename.to_string(),
                path: self.path(id)?,
            });
        }
        Ok(())
    }

    pub fn link_file(&mut self, id: NodeId, filename: &str, blob_id: &str) -> Result<(), NamespaceError> {
        self.ensure_file_absent(id, filename)?;
        self.node_mut(id)?
            .files
            .insert(filename.to_string(), blob_id.to_string());
        Ok(())
    }

    /// Remove a file association, returning the blob id it pointed to
    pub fn unlink_file(&mut self, id: NodeId, filename: &str) -> Result<String, NamespaceError> {
        let blob_id = self.blob_id(id, filename)?;
        self.node_mut(id)?.files.remove(filename);
        Ok(blob_id)
    }

    pub(crate) fn set_files(&mut self, id: NodeId, files: HashMap<String, String>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.files = files;
        }
    }

    /// Names from the root (exclusive) down to `id`, joined with `/`
    pub fn path(&self, id: NodeId) -> Result<String, NamespaceError> {
        let mut segments = Vec::new();
        let mut current = self.node(id)?;
        while let Some(parent) = current.parent {
            segments.push(current.name.as_str());
            current = self.node(parent)?;
        }
        segments.reverse();
        Ok(segments.join("/"))
    }

    /// Number of edges between the root and `id`
    pub fn depth(&self, id: NodeId) -> Result<usize, NamespaceError> {
        let mut depth = 0;
        let mut current = self.node(id)?;
        while let Some(parent) = current.parent {
            depth += 1;
            current = self.node(parent)?;
        }
        Ok(depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tree_has_empty_root() {
        let tree = NamespaceTree::new("Juan");
        let root = tree.root();

        assert_eq!(tree.user(), "Juan");
        assert_eq!(tree.node(root).unwrap().name(), ROOT_NAME);
        assert!(tree.node(root).unwrap().is_root());
        assert!(tree.children(root).unwrap().is_empty());
        assert!(tree.files(root).unwrap().is_empty());
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_root_has_no_parent() {
        let tree = NamespaceTree::new("Juan");
        assert!(matches!(tree.parent(tree.root()), Err(NamespaceError::RootHasNoParent)));
    }

    #[test]
    fn test_paths() {
        let mut tree = NamespaceTree::new("Juan");
        let root = tree.root();
        let documents = tree.create_child(root, "Documents").unwrap();
        let reports = tree.create_child(documents, "Reports").unwrap();

        assert_eq!(tree.path(root).unwrap(), "");
        assert_eq!(tree.path(documents).unwrap(), "Documents");
        assert_eq!(tree.path(reports).unwrap(), "Documents/Reports");
        assert_eq!(tree.parent(reports).unwrap(), documents);
        assert_eq!(tree.depth(reports).unwrap(), 2);
    }

    #[test]
    fn test_duplicate_child_rejected() {
        let mut tree = NamespaceTree::new("Juan");
        let root = tree.root();
        tree.create_child(root, "Images").unwrap();

        let err = tree.create_child(root, "Images").unwrap_err();
        match err {
            NamespaceError::ChildAlreadyExists { name, path } => {
                assert_eq!(name, "Images");
                assert_eq!(path, "");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(tree.children(root).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_child() {
        let mut tree = NamespaceTree::new("Juan");
        let root = tree.root();
        let documents = tree.create_child(root, "Documents").unwrap();

        let err = tree.child(documents, "Missing").unwrap_err();
        match err {
            NamespaceError::ChildNotFound { name, path } => {
                assert_eq!(name, "Missing");
                assert_eq!(path, "Documents");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            tree.remove_child(root, "Missing"),
            Err(NamespaceError::ChildNotFound { .. })
        ));
    }

    #[test]
    fn test_remove_child_discards_subtree() {
        let mut tree = NamespaceTree::new("Juan");
        let root = tree.root();
        let images = tree.create_child(root, "Images").unwrap();
        let holidays = tree.create_child(images, "Holidays").unwrap();
        tree.link_file(holidays, "beach.png", "blob-beach").unwrap();
        assert_eq!(tree.node_count(), 3);

        tree.remove_child(root, "Images").unwrap();

        assert_eq!(tree.node_count(), 1);
        assert!(!tree.contains(images));
        assert!(matches!(tree.path(holidays), Err(NamespaceError::NodeRemoved { .. })));
    }

    #[test]
    fn test_subtree_blob_ids_counts_every_file() {
        let mut tree = NamespaceTree::new("Juan");
        let root = tree.root();
        let images = tree.create_child(root, "Images").unwrap();
        let holidays = tree.create_child(images, "Holidays").unwrap();
        tree.link_file(images, "logo.png", "blob-logo").unwrap();
        tree.link_file(holidays, "beach.png", "blob-shared").unwrap();
        tree.link_file(holidays, "beach-copy.png", "blob-shared").unwrap();
        tree.link_file(root, "notes.txt", "blob-notes").unwrap();

        let mut blob_ids = tree.subtree_blob_ids(images).unwrap();
        blob_ids.sort();
        assert_eq!(blob_ids, vec!["blob-logo", "blob-shared", "blob-shared"]);
        let empty = tree.create_child(root, "Empty").unwrap();
        assert!(tree.subtree_blob_ids(empty).unwrap().is_empty());
    }

    #[test]
    fn test_recreated_child_is_fresh() {
        let mut tree = NamespaceTree::new("Juan");
        let root = tree.root();
        let images = tree.create_child(root, "Images").unwrap();
        tree.create_child(images, "Nested").unwrap();
        tree.link_file(images, "cat.png", "blob-cat").unwrap();

        tree.remove_child(root, "Images").unwrap();
        let again = tree.create_child(root, "Images").unwrap();

        assert_ne!(again, images);
        assert!(tree.children(again).unwrap().is_empty());
        assert!(tree.files(again).unwrap().is_empty());
        assert_eq!(tree.path(again).unwrap(), "Images");
    }

    #[test]
    fn test_file_lifecycle() {
        let mut tree = NamespaceTree::new("Juan");
        let root = tree.root();
        let documents = tree.create_child(root, "Documents").unwrap();

        tree.link_file(documents, "file1.txt", "blob1").unwrap();
        assert_eq!(tree.blob_id(documents, "file1.txt").unwrap(), "blob1");
        assert!(matches!(
            tree.link_file(documents, "file1.txt", "blob2"),
            Err(NamespaceError::FileAlreadyExists { .. })
        ));
        assert_eq!(tree.blob_id(documents, "file1.txt").unwrap(), "blob1");

        assert_eq!(tree.unlink_file(documents, "file1.txt").unwrap(), "blob1");
        assert!(matches!(
            tree.blob_id(documents, "file1.txt"),
            Err(NamespaceError::FileNotFound { .. })
        ));
        assert!(matches!(
            tree.unlink_file(documents, "naf.f"),
            Err(NamespaceError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_directory_and_file_may_share_a_name() {
        let mut tree = NamespaceTree::new("Juan");
        let root = tree.root();
        tree.create_child(root, "notes").unwrap();
        tree.link_file(root, "notes", "blob-notes").unwrap();

        assert!(tree.children(root).unwrap().contains("notes"));
        assert!(tree.files(root).unwrap().contains("notes"));
    }

    #[test]
    fn test_invalid_names() {
        let mut tree = NamespaceTree::new("Juan");
        let root = tree.root();

        for name in ["", "a/b", ".", ".."] {
            assert!(matches!(
                tree.create_child(root, name),
                Err(NamespaceError::InvalidName(_))
            ));
            assert!(matches!(
                tree.link_file(root, name, "blob"),
                Err(NamespaceError::InvalidName(_))
            ));
        }
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_depth_limit() {
        let mut tree = NamespaceTree::new("Juan");
        let mut current = tree.root();
        for level in 0..MAX_TREE_DEPTH {
            current = tree.create_child(current, &format!("d{level}")).unwrap();
        }

        let err = tree.create_child(current, "too-deep").unwrap_err();
        assert!(matches!(err, NamespaceError::DepthLimitExceeded { max, .. } if max == MAX_TREE_DEPTH));
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = NamespaceError::ChildAlreadyExists {
            name: "Images".into(),
            path: "Documents".into(),
        };
        assert_eq!(err.to_string(), "Child directory 'Images' already exists in '/Documents'");
        assert_eq!(
            NamespaceError::ServiceUnavailable(ServiceKind::Blob).to_string(),
            "No blob service available"
        );
    }
}
