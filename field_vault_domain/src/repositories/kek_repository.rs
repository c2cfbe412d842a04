// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # KEK Repository Port
//!
//! Abstraction over the persistent KEK version registry. The registry is a
//! single table keyed by `(alias, version)` with one invariant the
//! implementation must uphold: for any alias, at most one row is
//! non-deprecated (the registry may also be empty for an alias that has not
//! been bootstrapped).
//!
//! Reads must observe the effects of prior writes within the same engine.
//! Rotation (`rotate_to`) must apply its insert and its deprecation
//! atomically with respect to concurrent readers; a primary-key collision
//! on the insert (a concurrent rotation won the race) surfaces as
//! `VersionConflict`.

use async_trait::async_trait;

use crate::entities::KekEntry;
use crate::value_objects::{KekAlias, KeyVersion};
use crate::VaultError;

/// Persistence port for the KEK version registry.
#[async_trait]
pub trait KekRepository: Send + Sync {
    /// Returns the highest non-deprecated version for the alias, `None`
    /// when the alias has no active version.
    async fn current_version(&self, alias: &KekAlias) -> Result<Option<KeyVersion>, VaultError>;

    /// Resolves `(alias, version)` to the external key id; fails with
    /// `UnknownKeyVersion` when the row does not exist.
    async fn resolve(&self, alias: &KekAlias, version: KeyVersion) -> Result<String, VaultError>;

    /// Inserts a new registry row; fails with `VersionConflict` when the
    /// `(alias, version)` pair already exists.
    async fn record_new(
        &self,
        alias: &KekAlias,
        version: KeyVersion,
        external_key_id: &str,
    ) -> Result<(), VaultError>;

    /// Marks a version deprecated. Deprecated versions stay resolvable.
    async fn deprecate(&self, alias: &KekAlias, version: KeyVersion) -> Result<(), VaultError>;

    /// Rotation transition: inserts `new_version` and deprecates every
    /// older version of the alias in a single transaction.
    async fn rotate_to(
        &self,
        alias: &KekAlias,
        new_version: KeyVersion,
        external_key_id: &str,
    ) -> Result<(), VaultError>;

    /// Returns the active (non-deprecated) row for the alias, `None` when
    /// the alias is empty.
    async fn find_active(&self, alias: &KekAlias) -> Result<Option<KekEntry>, VaultError>;

    /// Lists every version recorded for the alias, newest first.
    async fn list_versions(&self, alias: &KekAlias) -> Result<Vec<KekEntry>, VaultError>;
}
