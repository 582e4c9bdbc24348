// Copyright (c) 2026 IceDrive Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the IceDrive namespace CLI

pub mod config;
pub mod inspect;

pub use self::config::ConfigCommand;
