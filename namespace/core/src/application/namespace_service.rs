// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Namespace Service
//!
//! Entry point of the namespace: resolves a user's root after consulting an
//! authenticator, and exposes every directory through [`NodeHandle`].
//!
//! Loaded trees are cached per user. Each cached tree sits behind its own
//! `RwLock`; reads share it, mutations hold it exclusively for the whole
//! check, blob call, persist and swap sequence. A mutation is applied to a
//! copy of the tree and swapped in only once the copy has been persisted,
//! so a failed write leaves the cached tree untouched.
//!
//! Collaborator calls are bounded by the configured timeout and retried
//! once against a different instance before failing with
//! `ServiceUnavailable`.
//!
//! Past the cache capacity, trees that no [`NodeHandle`] refers to are
//! evicted; a tree with live handles is never dropped, so a user never has
//! two copies of their tree in memory.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Authorization gate, root resolution and node operations

use crate::application::namespace_store::NamespaceStore;
use crate::domain::discovery::{CollaboratorError, NamespacePeer, ServiceId, ServiceKind};
use crate::domain::document::UserKey;
use crate::domain::events::NamespaceEvent;
use crate::domain::namespace::{NamespaceError, NamespaceTree, NodeId};
use crate::domain::repository::NamespaceRepository;
use crate::domain::service_config::NamespaceServiceConfig;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::repositories::create_repository;
use crate::infrastructure::service_registry::ServiceRegistry;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, warn};

/// First attempt plus one retry on a different instance
const CALL_ATTEMPTS: usize = 2;

pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

type SharedTree = Arc<RwLock<NamespaceTree>>;
type TreeCell = Arc<OnceCell<SharedTree>>;

#[derive(Debug, Clone, Copy)]
enum BlobCall {
    Link,
    Unlink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlobOutcome {
    Applied,
    /// Unlink of an id the blob service no longer tracks
    NothingReleased,
}

struct ServiceInner {
    instance_id: ServiceId,
    registry: Arc<ServiceRegistry>,
    store: NamespaceStore,
    event_bus: EventBus,
    collaborator_timeout: Duration,
    cache_capacity: AtomicUsize,
    trees: parking_lot::Mutex<HashMap<UserKey, TreeCell>>,
}

/// Namespace service instance, cheap to clone and share between handlers
#[derive(Clone)]
pub struct NamespaceService {
    inner: Arc<ServiceInner>,
}

impl NamespaceService {
    pub fn new(
        instance_id: ServiceId,
        registry: Arc<ServiceRegistry>,
        repository: Arc<dyn NamespaceRepository>,
        event_bus: EventBus,
        collaborator_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                instance_id,
                registry,
                store: NamespaceStore::new(repository),
                event_bus,
                collaborator_timeout,
                cache_capacity: AtomicUsize::new(DEFAULT_CACHE_CAPACITY),
                trees: parking_lot::Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Build a service with the storage backend and timeouts of `config`
    pub fn from_config(
        config: &NamespaceServiceConfig,
        registry: Arc<ServiceRegistry>,
    ) -> Result<Self, NamespaceError> {
        let repository = create_repository(config.storage_backend())?;
        let service = Self::new(
            config.instance_id(),
            registry,
            repository,
            EventBus::with_default_capacity(),
            config.collaborator_timeout(),
        );
        service.set_cache_capacity(config.cache_capacity());
        Ok(service)
    }

    pub fn instance_id(&self) -> &ServiceId {
        &self.inner.instance_id
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.inner.registry
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.event_bus
    }

    /// Number of trees above which idle ones are evicted (at least one)
    pub fn set_cache_capacity(&self, capacity: usize) {
        self.inner.cache_capacity.store(capacity.max(1), Ordering::Relaxed);
    }

    /// Trees currently held in the cache, loaded or loading
    pub fn cached_trees(&self) -> usize {
        self.inner.trees.lock().len()
    }

    /// Drop every cached tree no handle refers to, returning how many went
    pub fn evict_idle_trees(&self) -> usize {
        evict_idle(&mut self.inner.trees.lock())
    }

    /// Resolve the root of `user`, creating it on first access
    ///
    /// Fails with `ServiceUnavailable(authentication)` when no authenticator
    /// answers and with `Unauthorized` when the user has no live session.
    pub async fn get_root(&self, user: &str) -> Result<NodeHandle, NamespaceError> {
        self.authorize(user).await?;
        let tree = self.tree(user).await?;
        let root = tree.read().await.root();
        Ok(NodeHandle {
            service: self.clone(),
            user: user.to_string(),
            tree,
            node: root,
        })
    }

    async fn tree(&self, user: &str) -> Result<SharedTree, NamespaceError> {
        let key = UserKey::for_user(user);
        let cell = {
            let mut trees = self.inner.trees.lock();
            if !trees.contains_key(&key) && trees.len() >= self.inner.cache_capacity.load(Ordering::Relaxed) {
                let evicted = evict_idle(&mut trees);
                debug!(evicted, cached = trees.len(), "Evicted idle namespace trees");
            }
            trees.entry(key).or_default().clone()
        };

        let loaded = cell
            .get_or_try_init(|| async {
                let loaded = self.inner.store.load_or_create(user).await?;
                if loaded.created {
                    self.inner.event_bus.publish(NamespaceEvent::RootCreated {
                        user: user.to_string(),
                        created_at: Utc::now(),
                    });
                }
                Ok::<_, NamespaceError>(Arc::new(RwLock::new(loaded.tree)))
            })
            .await;

        match loaded {
            Ok(tree) => Ok(tree.clone()),
            Err(e) => {
                let mut trees = self.inner.trees.lock();
                // other waiters still holding the cell will retry the load themselves
                let abandoned = trees.get(&key).is_some_and(|current| {
                    Arc::ptr_eq(current, &cell) && Arc::strong_count(&cell) == 2 && !cell.initialized()
                });
                if abandoned {
                    trees.remove(&key);
                }
                Err(e)
            }
        }
    }

    /// Check that `user` holds a live session
    async fn authorize(&self, user: &str) -> Result<(), NamespaceError> {
        let mut tried: Vec<ServiceId> = Vec::new();

        for _ in 0..CALL_ATTEMPTS {
            let Some((id, authenticator)) = self.inner.registry.select_authenticator(&tried) else {
                break;
            };

            match self.bounded(authenticator.is_live(user)).await {
                Ok(true) => return Ok(()),
                Ok(false) => {
                    debug!(user, service_id = %id, "Authenticator rejected user");
                    return Err(NamespaceError::Unauthorized {
                        user: user.to_string(),
                    });
                }
                Err(e) => {
                    warn!(user, service_id = %id, error = %e, "Authenticator call failed");
                    tried.push(id);
                }
            }
        }

        Err(NamespaceError::ServiceUnavailable(ServiceKind::Authentication))
    }

    /// Call a blob service, retrying once on another instance
    ///
    /// An unlink of an id the blob service does not know has no reference
    /// left to drop and yields [`BlobOutcome::NothingReleased`].
    async fn call_blob_service(&self, call: BlobCall, blob_id: &str) -> Result<BlobOutcome, NamespaceError> {
        let mut tried: Vec<ServiceId> = Vec::new();

        for _ in 0..CALL_ATTEMPTS {
            let Some((id, blob_service)) = self.inner.registry.select_blob_service(&tried) else {
                break;
            };

            let result = match call {
                BlobCall::Link => self.bounded(blob_service.link(blob_id)).await,
                BlobCall::Unlink => self.bounded(blob_service.unlink(blob_id)).await,
            };

            match result {
                Ok(()) => {
                    debug!(blob_id, service_id = %id, ?call, "Blob service call succeeded");
                    return Ok(BlobOutcome::Applied);
                }
                Err(CollaboratorError::UnknownBlob(_)) if matches!(call, BlobCall::Unlink) => {
                    warn!(blob_id, service_id = %id, "Blob service holds no reference to release");
                    return Ok(BlobOutcome::NothingReleased);
                }
                Err(e) if !e.is_retryable() => {
                    warn!(blob_id, service_id = %id, ?call, error = %e, "Blob service refused call");
                    return Err(NamespaceError::UnknownBlob {
                        blob_id: blob_id.to_string(),
                    });
                }
                Err(e) => {
                    warn!(blob_id, service_id = %id, ?call, error = %e, "Blob service call failed");
                    tried.push(id);
                }
            }
        }

        Err(NamespaceError::ServiceUnavailable(ServiceKind::Blob))
    }

    /// Undo a blob call whose namespace change could not be persisted
    async fn compensate(&self, call: BlobCall, blob_id: &str) {
        warn!(blob_id, ?call, "Compensating blob service call after failed persist");
        if let Err(e) = self.call_blob_service(call, blob_id).await {
            warn!(blob_id, ?call, error = %e, "Blob compensation failed");
        }
    }

    /// Best-effort unlink of references held by a removed subtree
    async fn release_blobs(&self, blob_ids: &[String]) {
        for blob_id in blob_ids {
            if let Err(e) = self.call_blob_service(BlobCall::Unlink, blob_id).await {
                warn!(blob_id = %blob_id, error = %e, "Failed to release blob of removed directory");
            }
        }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, CollaboratorError>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        let timeout = self.inner.collaborator_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::Timeout(
                u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }

    /// Persist `updated`, then replace `current` with it
    async fn commit(&self, current: &mut NamespaceTree, updated: NamespaceTree) -> Result<(), NamespaceError> {
        if let Err(e) = self.inner.store.save(&updated).await {
            warn!(user = current.user(), "Rolled back namespace change after failed persist");
            return Err(e);
        }
        *current = updated;
        Ok(())
    }
}

/// Remove cache entries nobody else holds: no loader waiting on the cell and
/// no handle sharing the tree
fn evict_idle(trees: &mut HashMap<UserKey, TreeCell>) -> usize {
    let before = trees.len();
    trees.retain(|_, cell| {
        let idle = Arc::strong_count(cell) == 1 && cell.get().is_none_or(|tree| Arc::strong_count(tree) == 1);
        !idle
    });
    before - trees.len()
}

#[async_trait]
impl NamespacePeer for NamespaceService {
    fn instance_id(&self) -> ServiceId {
        self.inner.instance_id.clone()
    }

    async fn ping(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// Reference to one directory of a user's namespace
///
/// Every operation re-checks the user's session before touching the tree.
/// A handle outlives the directory it points to; once the directory is
/// removed, operations on the handle fail with `NodeRemoved`.
#[derive(Clone)]
pub struct NodeHandle {
    service: NamespaceService,
    user: String,
    tree: SharedTree,
    node: NodeId,
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle")
            .field("user", &self.user)
            .field("node", &self.node)
            .finish()
    }
}

impl NodeHandle {
    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    fn at(&self, node: NodeId) -> NodeHandle {
        NodeHandle {
            node,
            ..self.clone()
        }
    }

    pub async fn get_parent(&self) -> Result<NodeHandle, NamespaceError> {
        self.service.authorize(&self.user).await?;
        let parent = self.tree.read().await.parent(self.node)?;
        Ok(self.at(parent))
    }

    pub async fn get_children(&self) -> Result<BTreeSet<String>, NamespaceError> {
        self.service.authorize(&self.user).await?;
        self.tree.read().await.children(self.node)
    }

    pub async fn get_child(&self, name: &str) -> Result<NodeHandle, NamespaceError> {
        self.service.authorize(&self.user).await?;
        let child = self.tree.read().await.child(self.node, name)?;
        Ok(self.at(child))
    }

    pub async fn create_child(&self, name: &str) -> Result<NodeHandle, NamespaceError> {
        self.service.authorize(&self.user).await?;
        let mut tree = self.tree.write().await;

        let mut updated = (*tree).clone();
        let child = updated.create_child(self.node, name)?;
        let path = updated.path(child)?;
        self.service.commit(&mut tree, updated).await?;

        debug!(user = %self.user, path = %path, "Created directory");
        self.service.event_bus().publish(NamespaceEvent::ChildCreated {
            user: self.user.clone(),
            path,
            created_at: Utc::now(),
        });
        Ok(self.at(child))
    }

    /// Detach the child directory `name` together with everything below it
    ///
    /// Blob references held by files in the subtree are released after the
    /// removal is persisted; a blob service failure there does not fail the
    /// removal.
    pub async fn remove_child(&self, name: &str) -> Result<(), NamespaceError> {
        self.service.authorize(&self.user).await?;
        let mut tree = self.tree.write().await;

        let mut updated = (*tree).clone();
        let child = updated.child(self.node, name)?;
        let path = updated.path(child)?;
        let blob_ids = updated.subtree_blob_ids(child)?;
        updated.remove_child(self.node, name)?;
        self.service.commit(&mut tree, updated).await?;
        drop(tree);

        self.service.release_blobs(&blob_ids).await;
        debug!(user = %self.user, path = %path, released = blob_ids.len(), "Removed directory");
        self.service.event_bus().publish(NamespaceEvent::ChildRemoved {
            user: self.user.clone(),
            path,
            removed_at: Utc::now(),
        });
        Ok(())
    }

    pub async fn get_files(&self) -> Result<BTreeSet<String>, NamespaceError> {
        self.service.authorize(&self.user).await?;
        self.tree.read().await.files(self.node)
    }

    pub async fn get_blob_id(&self, filename: &str) -> Result<String, NamespaceError> {
        self.service.authorize(&self.user).await?;
        self.tree.read().await.blob_id(self.node, filename)
    }

    /// Link `filename` to `blob_id`, registering the reference with a blob service
    pub async fn link_file(&self, filename: &str, blob_id: &str) -> Result<(), NamespaceError> {
        self.service.authorize(&self.user).await?;
        let mut tree = self.tree.write().await;

        tree.ensure_file_absent(self.node, filename)?;
        let path = tree.path(self.node)?;
        self.service.call_blob_service(BlobCall::Link, blob_id).await?;

        let mut updated = (*tree).clone();
        let committed = match updated.link_file(self.node, filename, blob_id) {
            Ok(()) => self.service.commit(&mut tree, updated).await,
            Err(e) => Err(e),
        };
        if let Err(e) = committed {
            self.service.compensate(BlobCall::Unlink, blob_id).await;
            return Err(e);
        }

        debug!(user = %self.user, path = %path, filename, blob_id, "Linked file");
        self.service.event_bus().publish(NamespaceEvent::FileLinked {
            user: self.user.clone(),
            path,
            filename: filename.to_string(),
            blob_id: blob_id.to_string(),
            linked_at: Utc::now(),
        });
        Ok(())
    }

    /// Unlink `filename`, releasing its blob reference
    pub async fn unlink_file(&self, filename: &str) -> Result<(), NamespaceError> {
        self.service.authorize(&self.user).await?;
        let mut tree = self.tree.write().await;

        let blob_id = tree.blob_id(self.node, filename)?;
        let path = tree.path(self.node)?;
        let outcome = self.service.call_blob_service(BlobCall::Unlink, &blob_id).await?;

        let mut updated = (*tree).clone();
        let committed = match updated.unlink_file(self.node, filename) {
            Ok(_) => self.service.commit(&mut tree, updated).await,
            Err(e) => Err(e),
        };
        if let Err(e) = committed {
            if outcome == BlobOutcome::Applied {
                self.service.compensate(BlobCall::Link, &blob_id).await;
            }
            return Err(e);
        }

        debug!(user = %self.user, path = %path, filename, blob_id = %blob_id, "Unlinked file");
        self.service.event_bus().publish(NamespaceEvent::FileUnlinked {
            user: self.user.clone(),
            path,
            filename: filename.to_string(),
            blob_id,
            unlinked_at: Utc::now(),
        });
        Ok(())
    }

    /// Slash-joined names from the root (exclusive); empty for the root
    pub async fn get_path(&self) -> Result<String, NamespaceError> {
        self.service.authorize(&self.user).await?;
        self.tree.read().await.path(self.node)
    }
}
