// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Announcer - Background task for service self-announcement
//!
//! Periodically pushes this instance's identity and handle to every
//! configured discovery channel so peers keep it in their registries. The
//! first announcement happens as soon as the task starts.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Keeps discovery registries populated

use crate::application::namespace_service::NamespaceService;
use crate::domain::discovery::{DiscoveryChannel, ServiceHandle, ServiceId};
use crate::domain::service_config::NamespaceServiceConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shortest accepted period between announcements
pub const MIN_ANNOUNCE_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for the announcer
#[derive(Debug, Clone)]
pub struct AnnouncerConfig {
    /// Time between two announcements
    pub interval: Duration,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

impl From<&NamespaceServiceConfig> for AnnouncerConfig {
    fn from(config: &NamespaceServiceConfig) -> Self {
        Self {
            interval: config.announce_interval(),
        }
    }
}

pub struct Announcer {
    id: ServiceId,
    handle: ServiceHandle,
    channels: Vec<Arc<dyn DiscoveryChannel>>,
    config: AnnouncerConfig,
    shutdown_token: CancellationToken,
}

impl Announcer {
    /// Intervals below [`MIN_ANNOUNCE_INTERVAL`] are raised to it
    pub fn new(id: ServiceId, handle: ServiceHandle, mut config: AnnouncerConfig) -> Self {
        if config.interval < MIN_ANNOUNCE_INTERVAL {
            warn!(
                service_id = %id,
                requested_ms = config.interval.as_millis() as u64,
                "Announce interval too short, using minimum"
            );
            config.interval = MIN_ANNOUNCE_INTERVAL;
        }
        Self {
            id,
            handle,
            channels: Vec::new(),
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Announcer advertising `service` as a namespace instance
    pub fn for_namespace(service: &NamespaceService, config: AnnouncerConfig) -> Self {
        Self::new(
            service.instance_id().clone(),
            ServiceHandle::Namespace(Arc::new(service.clone())),
            config,
        )
    }

    pub fn with_channel(mut self, channel: Arc<dyn DiscoveryChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Announce once on every channel
    pub fn announce(&self) {
        for channel in &self.channels {
            channel.announce(self.id.clone(), self.handle.clone());
        }
        debug!(service_id = %self.id, channels = self.channels.len(), "Announced service");
    }

    /// Start the announcement loop, stopped through [`Self::shutdown_token`]
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        info!(
            service_id = %self.id,
            kind = %self.handle.kind(),
            interval_ms = self.config.interval.as_millis() as u64,
            "Starting announcer"
        );

        let mut tick = interval(self.config.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => break,
                _ = tick.tick() => self.announce(),
            }
        }

        info!(service_id = %self.id, "Announcer stopped");
    }
}
