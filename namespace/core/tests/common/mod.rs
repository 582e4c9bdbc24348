// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Shared fixtures for namespace integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use icedrive_namespace_core::domain::discovery::{Authenticator, BlobService, CollaboratorError, ServiceId};
use icedrive_namespace_core::domain::document::{NamespaceDocument, UserKey};
use icedrive_namespace_core::domain::repository::{NamespaceRepository, RepositoryError};
use icedrive_namespace_core::infrastructure::event_bus::EventBus;
use icedrive_namespace_core::infrastructure::repositories::InMemoryNamespaceRepository;
use icedrive_namespace_core::infrastructure::{LocalAuthenticator, LocalBlobService, ServiceRegistry};
use icedrive_namespace_core::NamespaceService;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TIMEOUT: Duration = Duration::from_millis(100);

/// Blob service that never answers within any sane timeout
#[derive(Default)]
pub struct HangingBlobService {
    pub calls: AtomicUsize,
}

#[async_trait]
impl BlobService for HangingBlobService {
    async fn link(&self, _blob_id: &str) -> Result<(), CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }

    async fn unlink(&self, _blob_id: &str) -> Result<(), CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

/// Blob service that rejects every id as unknown
#[derive(Default)]
pub struct RejectingBlobService {
    pub calls: AtomicUsize,
}

#[async_trait]
impl BlobService for RejectingBlobService {
    async fn link(&self, blob_id: &str) -> Result<(), CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CollaboratorError::UnknownBlob(blob_id.to_string()))
    }

    async fn unlink(&self, blob_id: &str) -> Result<(), CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CollaboratorError::UnknownBlob(blob_id.to_string()))
    }
}

/// Authenticator whose transport is down
pub struct UnreachableAuthenticator;

#[async_trait]
impl Authenticator for UnreachableAuthenticator {
    async fn is_live(&self, _user: &str) -> Result<bool, CollaboratorError> {
        Err(CollaboratorError::Unreachable("connection refused".to_string()))
    }
}

/// In-memory repository whose saves can be switched to fail, counting loads
#[derive(Clone, Default)]
pub struct FlakyRepository {
    pub inner: InMemoryNamespaceRepository,
    pub fail_saves: Arc<AtomicBool>,
    pub loads: Arc<AtomicUsize>,
}

impl FlakyRepository {
    pub fn set_failing(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl NamespaceRepository for FlakyRepository {
    async fn load(&self, key: &UserKey) -> Result<Option<NamespaceDocument>, RepositoryError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(key).await
    }

    async fn save(&self, key: &UserKey, document: &NamespaceDocument) -> Result<(), RepositoryError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RepositoryError::Io("disk full".to_string()));
        }
        self.inner.save(key, document).await
    }
}

/// Service wired to local collaborators, with the pieces tests poke at
pub struct Fixture {
    pub service: NamespaceService,
    pub registry: Arc<ServiceRegistry>,
    pub authenticator: Arc<LocalAuthenticator>,
    pub blobs: Arc<LocalBlobService>,
    pub repository: FlakyRepository,
}

impl Fixture {
    /// Registry with one authenticator and one blob service, session open for Juan
    pub fn new() -> Self {
        let registry = Arc::new(ServiceRegistry::new());
        let authenticator = Arc::new(LocalAuthenticator::with_users(["Juan"]));
        let blobs = Arc::new(LocalBlobService::new());
        registry.announce_authenticator("auth-1".into(), authenticator.clone());
        registry.announce_blob_service("blob-1".into(), blobs.clone());

        Self::with_registry(registry, authenticator, blobs)
    }

    /// Like [`Fixture::new`] but without any blob service
    pub fn without_blob_service() -> Self {
        let registry = Arc::new(ServiceRegistry::new());
        let authenticator = Arc::new(LocalAuthenticator::with_users(["Juan"]));
        registry.announce_authenticator("auth-1".into(), authenticator.clone());

        Self::with_registry(registry, authenticator, Arc::new(LocalBlobService::new()))
    }

    fn with_registry(
        registry: Arc<ServiceRegistry>,
        authenticator: Arc<LocalAuthenticator>,
        blobs: Arc<LocalBlobService>,
    ) -> Self {
        let repository = FlakyRepository::default();
        let service = NamespaceService::new(
            ServiceId::from("namespace-1"),
            registry.clone(),
            Arc::new(repository.clone()),
            EventBus::new(64),
            TIMEOUT,
        );

        Self {
            service,
            registry,
            authenticator,
            blobs,
            repository,
        }
    }

    /// Document currently persisted for `user`
    pub async fn persisted(&self, user: &str) -> Option<NamespaceDocument> {
        self.repository
            .inner
            .load(&UserKey::for_user(user))
            .await
            .unwrap()
    }
}
