// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Field Annotations
//!
//! This module provides the closed vocabulary of cryptographic operations a
//! record field can be annotated with, and the set type that combines them.
//!
//! ## Vocabulary
//!
//! - `encrypt`: serialize the value and AEAD-encrypt it with the record DEK
//! - `hash_basic`: deterministic keyed hash for searchable equality
//! - `hash_secure`: memory-hard password hash with pepper
//!
//! Operations in a combined set run independently against the original
//! plaintext; order within the set is irrelevant, so the set type is an
//! unordered value object.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::VaultError;

/// A single cryptographic operation a field can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Encrypt,
    HashBasic,
    HashSecure,
}

impl Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Encrypt => write!(f, "encrypt"),
            Transform::HashBasic => write!(f, "hash_basic"),
            Transform::HashSecure => write!(f, "hash_secure"),
        }
    }
}

impl FromStr for Transform {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "encrypt" => Ok(Transform::Encrypt),
            "hash_basic" => Ok(Transform::HashBasic),
            "hash_secure" => Ok(Transform::HashSecure),
            other => Err(VaultError::invalid_config(format!(
                "unknown annotation '{}': expected encrypt, hash_basic, or hash_secure",
                other
            ))),
        }
    }
}

/// The unordered set of transforms annotated on one field.
///
/// An empty set means the dispatcher leaves the field untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationSet {
    encrypt: bool,
    hash_basic: bool,
    hash_secure: bool,
}

impl AnnotationSet {
    pub const fn none() -> Self {
        Self {
            encrypt: false,
            hash_basic: false,
            hash_secure: false,
        }
    }

    pub const fn encrypt() -> Self {
        Self::none().and(Transform::Encrypt)
    }

    pub const fn hash_basic() -> Self {
        Self::none().and(Transform::HashBasic)
    }

    pub const fn hash_secure() -> Self {
        Self::none().and(Transform::HashSecure)
    }

    /// Adds a transform to the set.
    pub const fn and(mut self, transform: Transform) -> Self {
        match transform {
            Transform::Encrypt => self.encrypt = true,
            Transform::HashBasic => self.hash_basic = true,
            Transform::HashSecure => self.hash_secure = true,
        }
        self
    }

    pub const fn contains(&self, transform: Transform) -> bool {
        match transform {
            Transform::Encrypt => self.encrypt,
            Transform::HashBasic => self.hash_basic,
            Transform::HashSecure => self.hash_secure,
        }
    }

    pub const fn is_empty(&self) -> bool {
        !self.encrypt && !self.hash_basic && !self.hash_secure
    }

    /// Parses a comma-separated annotation list, e.g. `"encrypt,hash_basic"`.
    pub fn parse(spec: &str) -> Result<Self, VaultError> {
        let mut set = Self::none();
        for part in spec.split(',') {
            if part.trim().is_empty() {
                continue;
            }
            set = set.and(part.parse()?);
        }
        Ok(set)
    }
}

impl Display for AnnotationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (present, transform) in [
            (self.encrypt, Transform::Encrypt),
            (self.hash_basic, Transform::HashBasic),
            (self.hash_secure, Transform::HashSecure),
        ] {
            if present {
                if !first {
                    write!(f, ",")?;
                }
                write!(f, "{}", transform)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_from_str() {
        assert_eq!("encrypt".parse::<Transform>().unwrap(), Transform::Encrypt);
        assert_eq!(
            "hash_basic".parse::<Transform>().unwrap(),
            Transform::HashBasic
        );
        assert_eq!(
            "HASH_SECURE".parse::<Transform>().unwrap(),
            Transform::HashSecure
        );
        assert!("hash".parse::<Transform>().is_err());
        assert!("".parse::<Transform>().is_err());
    }

    #[test]
    fn test_set_composition() {
        let set = AnnotationSet::encrypt().and(Transform::HashBasic);
        assert!(set.contains(Transform::Encrypt));
        assert!(set.contains(Transform::HashBasic));
        assert!(!set.contains(Transform::HashSecure));
        assert!(!set.is_empty());
        assert!(AnnotationSet::none().is_empty());
    }

    #[test]
    fn test_order_is_irrelevant() {
        let a = AnnotationSet::parse("encrypt,hash_basic").unwrap();
        let b = AnnotationSet::parse("hash_basic, encrypt").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(AnnotationSet::parse("encrypt,order_preserving").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        let set = AnnotationSet::encrypt().and(Transform::HashSecure);
        let rendered = set.to_string();
        assert_eq!(AnnotationSet::parse(&rendered).unwrap(), set);
    }
}
