// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! KEK version counter.
//!
//! Versions start at 1 and increase monotonically per alias; every encrypted
//! record is stamped with the version that wrapped its DEK, so historical
//! versions must remain resolvable forever.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::VaultError;

/// A positive, monotonically increasing KEK version.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct KeyVersion(i64);

impl KeyVersion {
    /// The initial version assigned at bootstrap
    pub const INITIAL: KeyVersion = KeyVersion(1);

    /// Creates a version, rejecting zero and negative values.
    pub fn new(version: i64) -> Result<Self, VaultError> {
        if version < 1 {
            return Err(VaultError::invalid_config(format!(
                "key version must be positive, got {}",
                version
            )));
        }
        Ok(Self(version))
    }

    /// The successor version produced by a rotation.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl Display for KeyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl TryFrom<i64> for KeyVersion {
    type Error = VaultError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<KeyVersion> for i64 {
    fn from(version: KeyVersion) -> Self {
        version.0
    }
}
