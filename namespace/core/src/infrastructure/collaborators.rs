// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0

//! In-process collaborators
//!
//! Stand-ins for the authentication and blob services, used by local
//! development setups and by tests. Both are safe to share across tasks.

use crate::domain::discovery::{Authenticator, BlobService, CollaboratorError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Authenticator backed by a set of users with an open session
#[derive(Default)]
pub struct LocalAuthenticator {
    sessions: RwLock<HashSet<String>>,
}

impl LocalAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticator with sessions already open for `users`
    pub fn with_users<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sessions: RwLock::new(users.into_iter().map(Into::into).collect()),
        }
    }

    pub fn open_session(&self, user: &str) {
        if self.sessions.write().insert(user.to_string()) {
            debug!(user, "Session opened");
        }
    }

    pub fn close_session(&self, user: &str) {
        if self.sessions.write().remove(user) {
            debug!(user, "Session closed");
        }
    }
}

#[async_trait]
impl Authenticator for LocalAuthenticator {
    async fn is_live(&self, user: &str) -> Result<bool, CollaboratorError> {
        Ok(self.sessions.read().contains(user))
    }
}

/// Blob service that only tracks how many namespace entries reference each blob
#[derive(Default)]
pub struct LocalBlobService {
    references: RwLock<HashMap<String, u64>>,
}

impl LocalBlobService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current reference count of `blob_id` (0 when unknown)
    pub fn references(&self, blob_id: &str) -> u64 {
        self.references.read().get(blob_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl BlobService for LocalBlobService {
    async fn link(&self, blob_id: &str) -> Result<(), CollaboratorError> {
        let mut references = self.references.write();
        *references.entry(blob_id.to_string()).or_insert(0) += 1;
        Ok(())
    }

    async fn unlink(&self, blob_id: &str) -> Result<(), CollaboratorError> {
        let mut references = self.references.write();
        match references.get_mut(blob_id) {
            Some(count) if *count > 1 => {
                *count -= 1;
                Ok(())
            }
            Some(_) => {
                references.remove(blob_id);
                Ok(())
            }
            None => Err(CollaboratorError::UnknownBlob(blob_id.to_string())),
        }
    }
}
