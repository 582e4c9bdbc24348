// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0
//! IceDrive Namespace Core
//!
//! Per-user directory trees whose leaves reference content-addressed blobs,
//! persisted as one document per user and guarded by an external
//! authenticator located through service discovery.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Implements the namespace service and its collaborators

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
pub use application::namespace_service::{NamespaceService, NodeHandle};
