// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Namespace Document
//!
//! Serialized form of a whole user tree and the key it is stored under.
//!
//! ```json
//! {"name":"root","user":"Juan","childs":{"Documents":{"name":"Documents","files":{"file1.txt":"blob1"}}}}
//! ```
//!
//! Empty `files`/`childs` maps are omitted on write and defaulted on read.
//! Only the root document carries `user`. Reading a document rebuilds the
//! arena and its parent ids; the nesting depth is checked before any
//! recursion so a hostile document cannot exhaust the stack.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements the persisted form of the namespace aggregate

use crate::domain::namespace::{validate_name, NamespaceNode, NamespaceTree, NodeId, MAX_TREE_DEPTH};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Fixed namespace for deriving storage keys from usernames
pub const USER_KEY_NAMESPACE: Uuid = Uuid::from_u128(0x6c1e_d51f_41d2_4a37_9b0e_5f7c_2a9d_e3b1);

/// Storage key of a user's document
///
/// A name-based (v5) UUID of the username: stable across processes and
/// hosts, and it does not expose the username in storage paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserKey(pub Uuid);

impl UserKey {
    pub fn for_user(user: &str) -> Self {
        Self(Uuid::new_v5(&USER_KEY_NAMESPACE, user.as_bytes()))
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structural problems in a stored document
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("document nests deeper than {max} levels")]
    TooDeep { max: usize },

    #[error("invalid name '{name}' at '/{path}'")]
    InvalidName { name: String, path: String },

    #[error("child stored under '{key}' is named '{name}' at '/{path}'")]
    NameMismatch { key: String, name: String, path: String },

    #[error("document belongs to '{found}', expected '{expected}'")]
    UserMismatch { expected: String, found: String },
}

/// One directory and everything beneath it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDocument {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub childs: BTreeMap<String, NamespaceDocument>,
}

impl NamespaceDocument {
    /// Snapshot the whole tree, starting from its root
    pub fn from_tree(tree: &NamespaceTree) -> Self {
        let mut document = Self::from_node(tree, tree.root_node());
        document.user = Some(tree.user().to_string());
        document
    }

    fn from_node(tree: &NamespaceTree, node: &NamespaceNode) -> Self {
        Self {
            name: node.name().to_string(),
            user: None,
            files: node.files().iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            childs: node
                .children()
                .iter()
                .filter_map(|(name, child)| {
                    tree.get(*child)
                        .map(|child| (name.clone(), Self::from_node(tree, child)))
                })
                .collect(),
        }
    }

    /// Rebuild a tree for `user`
    ///
    /// A document written for another user is rejected. Documents without
    /// a `user` field are accepted as belonging to `user`.
    pub fn into_tree(self, user: &str) -> Result<NamespaceTree, DocumentError> {
        if let Some(found) = &self.user {
            if found != user {
                return Err(DocumentError::UserMismatch {
                    expected: user.to_string(),
                    found: found.clone(),
                });
            }
        }

        let depth = self.depth();
        if depth > MAX_TREE_DEPTH {
            return Err(DocumentError::TooDeep { max: MAX_TREE_DEPTH });
        }

        let mut tree = NamespaceTree::with_root_name(user, self.name);
        let root = tree.root();
        Self::attach_contents(&mut tree, root, self.files, self.childs)?;
        Ok(tree)
    }

    fn attach_contents(
        tree: &mut NamespaceTree,
        id: NodeId,
        files: BTreeMap<String, String>,
        childs: BTreeMap<String, NamespaceDocument>,
    ) -> Result<(), DocumentError> {
        let path = tree.path(id).unwrap_or_default();

        let mut linked = HashMap::with_capacity(files.len());
        for (filename, blob_id) in files {
            if validate_name(&filename).is_err() {
                return Err(DocumentError::InvalidName { name: filename, path });
            }
            linked.insert(filename, blob_id);
        }
        tree.set_files(id, linked);

        for (key, child) in childs {
            if validate_name(&key).is_err() {
                return Err(DocumentError::InvalidName { name: key, path });
            }
            if key != child.name {
                return Err(DocumentError::NameMismatch {
                    key,
                    name: child.name,
                    path,
                });
            }
            let child_id = tree.attach(id, key);
            Self::attach_contents(tree, child_id, child.files, child.childs)?;
        }
        Ok(())
    }

    /// Levels below this document, computed without recursion
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending: Vec<(&NamespaceDocument, usize)> = vec![(self, 0)];
        while let Some((document, level)) = pending.pop() {
            deepest = deepest.max(level);
            pending.extend(document.childs.values().map(|child| (child, level + 1)));
        }
        deepest
    }
}
