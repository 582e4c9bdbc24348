// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Namespace tree aggregate, its persisted document form, and the contracts
//! for persistence and collaborating services.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements the namespace model and its ports

pub mod namespace;
pub mod document;
pub mod repository;
pub mod discovery;
pub mod events;
pub mod service_config;
