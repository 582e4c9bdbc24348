// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod repositories;
pub mod service_registry;
pub mod collaborators;
pub mod event_bus;

pub use service_registry::ServiceRegistry;
pub use collaborators::{LocalAuthenticator, LocalBlobService};
