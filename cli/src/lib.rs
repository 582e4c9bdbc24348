// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0
//! IceDrive namespace CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Configuration management and offline namespace inspection

pub mod commands;
