// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # KEK Alias Value Object
//!
//! This module provides a validated alias for key-encryption keys and
//! service peppers. The alias is the stable name under which the external
//! KMS holds key material and the secret store holds the pepper; every
//! registry row and every secret-store path is keyed by it.
//!
//! ## Validation Rules
//!
//! - **Length**: 1–256 characters
//! - **Characters**: ASCII alphanumerics, hyphen (`-`), underscore (`_`)
//!
//! The charset is deliberately narrow: aliases travel into KMS resource
//! names, secret-store paths, and SQL rows, and must be safe in all three
//! without escaping.
//!
//! ## Usage
//!
//! ```
//! use field_vault_domain::value_objects::KekAlias;
//!
//! let alias = KekAlias::new("customer-data").unwrap();
//! assert_eq!(alias.as_str(), "customer-data");
//! assert!(KekAlias::new("bad alias!").is_err());
//! ```

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::VaultError;

/// Maximum alias length in characters
pub const MAX_ALIAS_LENGTH: usize = 256;

/// Validated alias for a KEK or pepper, immutable after creation.
///
/// Equality is attribute-based: two aliases with the same string are the
/// same alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KekAlias(String);

impl KekAlias {
    /// Creates a new alias, validating length and charset.
    pub fn new(alias: impl Into<String>) -> Result<Self, VaultError> {
        let alias = alias.into();
        Self::validate(&alias)?;
        Ok(Self(alias))
    }

    /// Validates an alias string without constructing the value object.
    pub fn validate(alias: &str) -> Result<(), VaultError> {
        if alias.is_empty() {
            return Err(VaultError::invalid_config("alias must not be empty"));
        }
        if alias.len() > MAX_ALIAS_LENGTH {
            return Err(VaultError::invalid_config(format!(
                "alias exceeds {} characters: {} characters",
                MAX_ALIAS_LENGTH,
                alias.len()
            )));
        }
        if let Some(bad) = alias
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(VaultError::invalid_config(format!(
                "alias contains invalid character '{}': only [A-Za-z0-9_-] is allowed",
                bad
            )));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for KekAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for KekAlias {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for KekAlias {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<KekAlias> for String {
    fn from(alias: KekAlias) -> Self {
        alias.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_aliases() {
        assert!(KekAlias::new("customer-data").is_ok());
        assert!(KekAlias::new("svc_payments_2024").is_ok());
        assert!(KekAlias::new("A").is_ok());
        assert!(KekAlias::new("a".repeat(256)).is_ok());
    }

    #[test]
    fn test_invalid_aliases() {
        assert!(KekAlias::new("").is_err());
        assert!(KekAlias::new("a".repeat(257)).is_err());
        assert!(KekAlias::new("bad alias").is_err());
        assert!(KekAlias::new("bad/alias").is_err());
        assert!(KekAlias::new("bad.alias").is_err());
        assert!(KekAlias::new("ütf8").is_err());
    }

    #[test]
    fn test_from_str_round_trip() {
        let alias: KekAlias = "customer-data".parse().unwrap();
        assert_eq!(alias.to_string(), "customer-data");
    }
}
