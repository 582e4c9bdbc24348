// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod namespace_store;
pub mod namespace_service;
pub mod announcer;

pub use namespace_store::NamespaceStore;
pub use namespace_service::{NamespaceService, NodeHandle};
pub use announcer::{Announcer, AnnouncerConfig};
