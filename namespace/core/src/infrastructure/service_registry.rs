// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0

// Service Registry - Discovered Collaborator Tracking and Selection
//
// Keeps the handles that authenticator, namespace and blob instances
// announced, and picks one of a given kind uniformly at random for each
// call. Entries are only added or refreshed by announcements; nothing
// expires them.

use crate::domain::discovery::{
    Authenticator, BlobService, DiscoveryChannel, NamespacePeer, ServiceHandle, ServiceId,
    ServiceKind,
};
use parking_lot::RwLock;
use rand::seq::IteratorRandom;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Registry of announced collaborators, shared by every request handler
#[derive(Default)]
pub struct ServiceRegistry {
    entries: RwLock<HashMap<ServiceKind, HashMap<ServiceId, ServiceHandle>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh the handle announced under `id`
    ///
    /// The kind is taken from the handle. Re-announcing an identity replaces
    /// its handle and never duplicates the entry.
    pub fn announce(&self, id: ServiceId, handle: ServiceHandle) {
        let kind = handle.kind();
        let replaced = self
            .entries
            .write()
            .entry(kind)
            .or_default()
            .insert(id.clone(), handle)
            .is_some();

        if replaced {
            debug!(service_id = %id, %kind, "Refreshed announced service");
        } else {
            info!(service_id = %id, %kind, "Discovered new service");
        }
    }

    pub fn announce_authenticator(&self, id: ServiceId, authenticator: Arc<dyn Authenticator>) {
        self.announce(id, ServiceHandle::Authentication(authenticator));
    }

    pub fn announce_blob_service(&self, id: ServiceId, blob_service: Arc<dyn BlobService>) {
        self.announce(id, ServiceHandle::Blob(blob_service));
    }

    pub fn announce_namespace(&self, id: ServiceId, peer: Arc<dyn NamespacePeer>) {
        self.announce(id, ServiceHandle::Namespace(peer));
    }

    /// Pick one known handle of `kind` at random
    pub fn select(&self, kind: ServiceKind) -> Option<(ServiceId, ServiceHandle)> {
        self.select_excluding(kind, &[])
    }

    /// Pick one known handle of `kind` at random, skipping `excluded` ids
    ///
    /// Used to retry a failed call against a different instance.
    pub fn select_excluding(
        &self,
        kind: ServiceKind,
        excluded: &[ServiceId],
    ) -> Option<(ServiceId, ServiceHandle)> {
        let entries = self.entries.read();
        entries
            .get(&kind)?
            .iter()
            .filter(|(id, _)| !excluded.contains(*id))
            .choose(&mut rand::rng())
            .map(|(id, handle)| (id.clone(), handle.clone()))
    }

    pub fn select_authenticator(
        &self,
        excluded: &[ServiceId],
    ) -> Option<(ServiceId, Arc<dyn Authenticator>)> {
        match self.select_excluding(ServiceKind::Authentication, excluded)? {
            (id, ServiceHandle::Authentication(authenticator)) => Some((id, authenticator)),
            _ => None,
        }
    }

    pub fn select_blob_service(
        &self,
        excluded: &[ServiceId],
    ) -> Option<(ServiceId, Arc<dyn BlobService>)> {
        match self.select_excluding(ServiceKind::Blob, excluded)? {
            (id, ServiceHandle::Blob(blob_service)) => Some((id, blob_service)),
            _ => None,
        }
    }

    pub fn select_namespace(
        &self,
        excluded: &[ServiceId],
    ) -> Option<(ServiceId, Arc<dyn NamespacePeer>)> {
        match self.select_excluding(ServiceKind::Namespace, excluded)? {
            (id, ServiceHandle::Namespace(peer)) => Some((id, peer)),
            _ => None,
        }
    }

    /// Number of known instances of `kind`
    pub fn count(&self, kind: ServiceKind) -> usize {
        self.entries.read().get(&kind).map_or(0, HashMap::len)
    }

    /// Identities of known instances of `kind`
    pub fn known(&self, kind: ServiceKind) -> Vec<ServiceId> {
        let mut ids: Vec<ServiceId> = self
            .entries
            .read()
            .get(&kind)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

impl DiscoveryChannel for ServiceRegistry {
    fn announce(&self, id: ServiceId, handle: ServiceHandle) {
        ServiceRegistry::announce(self, id, handle);
    }
}
