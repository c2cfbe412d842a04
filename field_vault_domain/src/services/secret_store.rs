// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Secret Store Port
//!
//! Pepper-only surface over an external secret store. The store holds the
//! 32-byte pepper verbatim under a deterministic path derived from the
//! service alias; the engine reads it once at construction.
//!
//! `store_pepper` has create-or-fail semantics: writing an alias that
//! already holds a value must fail rather than overwrite. The engine relies
//! on that conflict to detect a concurrent construction racing the same
//! alias, re-reads, and adopts the winner's pepper; two engines never
//! silently adopt divergent peppers.

use async_trait::async_trait;

use crate::VaultError;

/// External secret storage capability for the service pepper.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Probes whether a pepper exists under the alias.
    async fn pepper_exists(&self, alias: &str) -> Result<bool, VaultError>;

    /// Fetches the pepper bytes stored under the alias.
    async fn get_pepper(&self, alias: &str) -> Result<Vec<u8>, VaultError>;

    /// Stores pepper bytes under the alias; fails if a value already exists.
    async fn store_pepper(&self, alias: &str, pepper: &[u8]) -> Result<(), VaultError>;
}
