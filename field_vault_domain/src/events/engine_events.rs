// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Events
//!
//! Typed observability surface. The engine emits events at well-defined
//! points (operation start/completion, key operations, failures) through
//! a single capability value; it never owns the I/O those events may cause.
//!
//! The observer trait ships with empty default methods, so the no-op
//! observer is the trait's default behavior and the hot path pays nothing
//! for unobserved events.

use std::fmt::{self, Display};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The engine operations that emit lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineOperation {
    EncryptRecord,
    DecryptRecord,
    RotateKek,
}

impl Display for EngineOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineOperation::EncryptRecord => write!(f, "encrypt_record"),
            EngineOperation::DecryptRecord => write!(f, "decrypt_record"),
            EngineOperation::RotateKek => write!(f, "rotate_kek"),
        }
    }
}

/// Key-hierarchy operations reported through `on_key_operation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOperationKind {
    /// A DEK was wrapped under the current KEK
    Wrap,
    /// A DEK was unwrapped via a historical or current KEK
    Unwrap,
    /// A new external key was created at bootstrap
    Create,
    /// The alias rotated to a new KEK version
    Rotate,
}

impl Display for KeyOperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyOperationKind::Wrap => write!(f, "wrap"),
            KeyOperationKind::Unwrap => write!(f, "unwrap"),
            KeyOperationKind::Create => write!(f, "create"),
            KeyOperationKind::Rotate => write!(f, "rotate"),
        }
    }
}

/// Capability value through which the engine reports its lifecycle.
///
/// All methods default to no-ops; implement only what you observe. Events
/// carry identifiers (schema id, alias, version, error category) and never
/// secret material.
pub trait EngineObserver: Send + Sync {
    /// An operation began.
    fn on_operation_started(&self, operation: EngineOperation, schema_id: &str) {
        let _ = (operation, schema_id);
    }

    /// An operation completed successfully.
    fn on_operation_completed(
        &self,
        operation: EngineOperation,
        schema_id: &str,
        field_count: usize,
        duration: Duration,
    ) {
        let _ = (operation, schema_id, field_count, duration);
    }

    /// A key-hierarchy operation happened (wrap, unwrap, create, rotate).
    fn on_key_operation(&self, kind: KeyOperationKind, alias: &str, version: i64) {
        let _ = (kind, alias, version);
    }

    /// An operation failed; `category` is `VaultError::category()`.
    fn on_error(&self, operation: EngineOperation, category: &'static str) {
        let _ = (operation, category);
    }
}

/// The default observer: ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl EngineObserver for NoopObserver {}
