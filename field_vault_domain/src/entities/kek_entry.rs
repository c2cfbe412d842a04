// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! KEK registry row entity.
//!
//! Identity is the `(alias, version)` pair; the row's deprecation flag and
//! `updated_at` change over time while the identity persists. Rows are only
//! ever inserted or deprecated, never deleted: every version that has
//! wrapped a DEK must remain resolvable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{KekAlias, KeyVersion};

/// One row of the KEK version registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KekEntry {
    alias: KekAlias,
    version: KeyVersion,
    external_key_id: String,
    is_deprecated: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl KekEntry {
    pub fn new(
        alias: KekAlias,
        version: KeyVersion,
        external_key_id: impl Into<String>,
        is_deprecated: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            alias,
            version,
            external_key_id: external_key_id.into(),
            is_deprecated,
            created_at,
            updated_at,
        }
    }

    pub fn alias(&self) -> &KekAlias {
        &self.alias
    }

    pub fn version(&self) -> KeyVersion {
        self.version
    }

    /// Opaque identifier of the key inside the external KMS. Never reused
    /// across versions of the same alias.
    pub fn external_key_id(&self) -> &str {
        &self.external_key_id
    }

    pub fn is_deprecated(&self) -> bool {
        self.is_deprecated
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
