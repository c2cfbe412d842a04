// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! This module provides the error system for the field vault domain. It
//! implements a closed vocabulary of failure kinds that categorizes every
//! fault the engine can surface, provides actionable error messages, and
//! supports both automated handling and human-readable diagnostics.
//!
//! ## Overview
//!
//! The error system is designed around Domain-Driven Design principles:
//!
//! - **Domain-Specific**: Errors are tailored to field encryption domain
//!   concepts
//! - **Closed Vocabulary**: Every failure maps to exactly one kind; callers
//!   can match exhaustively
//! - **Actionable**: Each error carries enough context (alias, version, field
//!   name) to diagnose, and never any secret material
//! - **Aggregating**: Field-level failures are collected per field, not
//!   short-circuited, and returned as a single typed aggregate
//!
//! ## Error Categories
//!
//! #### Configuration Errors
//! - **InvalidConfiguration**: Alias charset/length, pepper length, Argon
//!   parameter bounds, record/descriptor shape mismatches
//!
//! #### Cryptographic Errors
//! - **AuthenticationFailed**: AEAD tag mismatch; no plaintext is returned
//! - **InvalidKey**: Key material with the wrong length
//! - **UnsupportedType**: The canonical serializer hit a value it cannot
//!   encode (or bytes it cannot decode)
//!
//! #### Key Hierarchy Errors
//! - **UnknownKeyVersion**: A ciphertext referenced a KEK version that is not
//!   in the registry
//! - **KmsFailure**: The KMS adapter failed; the message is sanitized so
//!   adapter internals do not leak
//! - **VersionConflict**: A concurrent rotation lost the insert race
//!
//! #### Infrastructure Errors
//! - **SecretStoreFailure**: Pepper read/write failure
//! - **RegistryFailure**: KEK registry I/O failure
//! - **Cancelled**: A deadline or cancellation token was observed
//!
//! #### Aggregates
//! - **ProcessingErrors**: Per-field failures collected by the dispatcher
//!
//! ## Error Handling Strategy
//!
//! Field-level errors are collected, not short-circuited: the dispatcher
//! attempts every annotated field and returns the full aggregate. Engine-level
//! errors are fatal to the operation: no partial encrypted record is ever
//! exposed, and any DEK already allocated is zeroized on the way out.

use std::collections::BTreeMap;

use thiserror::Error;

/// Domain-specific errors for the field vault engine.
///
/// This enum represents all possible errors that can occur within the engine.
/// Each variant includes a descriptive message and is designed to provide
/// clear information about what went wrong without disclosing secrets.
///
/// ## Design Principles
///
/// - **Specific**: Each error type represents a specific failure mode
/// - **Actionable**: Error messages provide enough context for debugging
/// - **Categorized**: Errors are grouped by type for systematic handling
/// - **Sanitized**: Messages never contain key material, peppers, or
///   plaintext field values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VaultError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Unknown key version {version} for alias '{alias}'")]
    UnknownKeyVersion { alias: String, version: i64 },

    #[error("KMS failure: {0}")]
    KmsFailure(String),

    #[error("Secret store failure: {0}")]
    SecretStoreFailure(String),

    #[error("Registry failure: {0}")]
    RegistryFailure(String),

    #[error("Version conflict: version {version} already recorded for alias '{alias}'")]
    VersionConflict { alias: String, version: i64 },

    #[error("{0}")]
    ProcessingErrors(ProcessingErrors),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl VaultError {
    /// Creates a new configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new unsupported-type error
    pub fn unsupported_type(msg: impl Into<String>) -> Self {
        Self::UnsupportedType(msg.into())
    }

    /// Creates a new authentication error
    pub fn authentication_failed(msg: impl Into<String>) -> Self {
        Self::AuthenticationFailed(msg.into())
    }

    /// Creates a new invalid-key error
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    /// Creates a new KMS error with a sanitized message
    pub fn kms_failure(msg: impl Into<String>) -> Self {
        Self::KmsFailure(msg.into())
    }

    /// Creates a new secret store error
    pub fn secret_store_failure(msg: impl Into<String>) -> Self {
        Self::SecretStoreFailure(msg.into())
    }

    /// Creates a new registry error
    pub fn registry_failure(msg: impl Into<String>) -> Self {
        Self::RegistryFailure(msg.into())
    }

    /// Creates a new cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Creates a new IO error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Checks if the error is recoverable by retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VaultError::KmsFailure(_)
                | VaultError::SecretStoreFailure(_)
                | VaultError::RegistryFailure(_)
                | VaultError::VersionConflict { .. }
                | VaultError::Io(_)
        )
    }

    /// Checks if the error indicates tampering or corrupted ciphertext
    pub fn is_security_error(&self) -> bool {
        matches!(
            self,
            VaultError::AuthenticationFailed(_) | VaultError::InvalidKey(_)
        )
    }

    /// Gets the error category
    pub fn category(&self) -> &'static str {
        match self {
            VaultError::InvalidConfiguration(_) => "configuration",
            VaultError::UnsupportedType(_) => "serialization",
            VaultError::AuthenticationFailed(_) => "authentication",
            VaultError::InvalidKey(_) => "key",
            VaultError::UnknownKeyVersion { .. } => "key_version",
            VaultError::KmsFailure(_) => "kms",
            VaultError::SecretStoreFailure(_) => "secret_store",
            VaultError::RegistryFailure(_) => "registry",
            VaultError::VersionConflict { .. } => "version_conflict",
            VaultError::ProcessingErrors(_) => "processing",
            VaultError::Cancelled(_) => "cancellation",
            VaultError::Io(_) => "io",
        }
    }
}

// Implement conversion from standard library errors
impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        VaultError::Io(err.to_string())
    }
}

/// Aggregate of per-field failures collected by the transform dispatcher.
///
/// The dispatcher attempts every annotated field and records each failure
/// under the field's name. The aggregate is returned by value; there is no
/// hidden collection state inside the engine.
///
/// Field names are the only record-specific context carried; values never
/// appear in the aggregate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessingErrors {
    errors: BTreeMap<String, VaultError>,
}

impl ProcessingErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure for the given field. The first failure per field
    /// wins; later ones for the same field are ignored.
    pub fn record(&mut self, field: impl Into<String>, error: VaultError) {
        self.errors.entry(field.into()).or_insert(error);
    }

    /// Merges another aggregate under a field-name prefix, used when a nested
    /// record fails ("address.city").
    pub fn merge_nested(&mut self, prefix: &str, nested: ProcessingErrors) {
        for (field, error) in nested.errors {
            self.errors
                .entry(format!("{}.{}", prefix, field))
                .or_insert(error);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns the failure recorded for a field, if any
    pub fn get(&self, field: &str) -> Option<&VaultError> {
        self.errors.get(field)
    }

    /// Iterates failures in field-name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &VaultError)> {
        self.errors.iter()
    }

    /// Converts the aggregate into a `VaultError`, or `Ok(())` when empty
    pub fn into_result(self) -> Result<(), VaultError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(VaultError::ProcessingErrors(self))
        }
    }
}

impl std::fmt::Display for ProcessingErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Processing failed for {} field(s): ", self.errors.len())?;
        let mut first = true;
        for (field, error) in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, error)?;
            first = false;
        }
        Ok(())
    }
}
