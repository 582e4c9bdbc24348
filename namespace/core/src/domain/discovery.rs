// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Service Discovery Contracts - Anti-Corruption Layer for Collaborators
//!
//! The namespace service never talks to another process directly. It holds
//! handles to collaborators that announced themselves, and only consumes the
//! narrow contracts defined here:
//!
//! - [`Authenticator`] answers whether a user's session is live
//! - [`BlobService`] accepts `link`/`unlink` for a blob id
//! - [`NamespacePeer`] is another namespace instance (liveness only)
//!
//! The transport behind a handle is out of scope; an RPC proxy, an
//! in-process service and a test fake all implement the same traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Kind of collaborating service tracked by discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Authentication,
    Namespace,
    Blob,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Authentication => "authentication",
            ServiceKind::Namespace => "namespace",
            ServiceKind::Blob => "blob",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of an announced service instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceId(pub String);

impl ServiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random identity for instances that were not given one
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Failure reported by a collaborator call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Transport-level failure; the instance may be gone
    #[error("Service unreachable: {0}")]
    Unreachable(String),

    /// The call did not complete within the configured timeout
    #[error("Call timed out after {0} ms")]
    Timeout(u64),

    /// The blob service does not know this blob id
    #[error("Unknown blob: {0}")]
    UnknownBlob(String),
}

impl CollaboratorError {
    /// Whether another instance of the same kind might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, CollaboratorError::Unreachable(_) | CollaboratorError::Timeout(_))
    }
}

/// Authentication service contract
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Whether `user` currently holds a valid session
    async fn is_live(&self, user: &str) -> Result<bool, CollaboratorError>;
}

/// Blob storage service contract (only the reference-counting half is consumed)
#[async_trait]
pub trait BlobService: Send + Sync {
    /// Record one more namespace reference to `blob_id`
    async fn link(&self, blob_id: &str) -> Result<(), CollaboratorError>;

    /// Drop one namespace reference to `blob_id`
    async fn unlink(&self, blob_id: &str) -> Result<(), CollaboratorError>;
}

/// Peer namespace service instance
#[async_trait]
pub trait NamespacePeer: Send + Sync {
    /// Identity this instance announces itself with
    fn instance_id(&self) -> ServiceId;

    /// Liveness probe
    async fn ping(&self) -> Result<(), CollaboratorError>;
}

/// Live handle to an announced collaborator
#[derive(Clone)]
pub enum ServiceHandle {
    Authentication(Arc<dyn Authenticator>),
    Namespace(Arc<dyn NamespacePeer>),
    Blob(Arc<dyn BlobService>),
}

impl ServiceHandle {
    pub fn kind(&self) -> ServiceKind {
        match self {
            ServiceHandle::Authentication(_) => ServiceKind::Authentication,
            ServiceHandle::Namespace(_) => ServiceKind::Namespace,
            ServiceHandle::Blob(_) => ServiceKind::Blob,
        }
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceHandle({})", self.kind())
    }
}

/// Receiving side of announcements
///
/// Implemented by the registry; the announcer pushes into any number of
/// channels without knowing what sits behind them.
pub trait DiscoveryChannel: Send + Sync {
    fn announce(&self, id: ServiceId, handle: ServiceHandle);
}
