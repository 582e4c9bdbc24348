// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Namespace mutation events
///
/// Published after the change has been persisted. Paths are relative to
/// the user's root, as returned by `getPath`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NamespaceEvent {
    RootCreated {
        user: String,
        created_at: DateTime<Utc>,
    },
    ChildCreated {
        user: String,
        path: String,
        created_at: DateTime<Utc>,
    },
    ChildRemoved {
        user: String,
        path: String,
        removed_at: DateTime<Utc>,
    },
    FileLinked {
        user: String,
        path: String,
        filename: String,
        blob_id: String,
        linked_at: DateTime<Utc>,
    },
    FileUnlinked {
        user: String,
        path: String,
        filename: String,
        blob_id: String,
        unlinked_at: DateTime<Utc>,
    },
}

impl NamespaceEvent {
    pub fn user(&self) -> &str {
        match self {
            NamespaceEvent::RootCreated { user, .. }
            | NamespaceEvent::ChildCreated { user, .. }
            | NamespaceEvent::ChildRemoved { user, .. }
            | NamespaceEvent::FileLinked { user, .. }
            | NamespaceEvent::FileUnlinked { user, .. } => user,
        }
    }
}
