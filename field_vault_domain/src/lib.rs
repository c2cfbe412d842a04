// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Field Vault Domain
//!
//! The field vault domain represents the core business logic and rules of
//! the field-level encryption engine. It implements Domain-Driven Design
//! (DDD) patterns and is completely independent of external concerns like
//! databases, key management services, or secret stores.
//!
//! ## What the Engine Does
//!
//! Given a typed record whose fields carry cryptographic annotations, the
//! engine produces a parallel encrypted record: AEAD ciphertexts for
//! `encrypt` fields, deterministic keyed hashes for `hash_basic` fields,
//! memory-hard password hashes for `hash_secure` fields, all under a
//! per-record data encryption key that is wrapped by a versioned
//! key-encryption key held in an external KMS.
//!
//! ## Domain-Driven Design Concepts
//!
//! ### Value Objects
//! Immutable objects defined by their attributes; self-validating.
//!
//! **Examples in this domain:**
//! - `KekAlias`: Validated key alias (charset and length rules)
//! - `KeyVersion`: Positive, monotonically increasing KEK version
//! - `Dek`: 32-byte data encryption key, zeroized on drop
//! - `Pepper`: 32-byte service secret, never all-zero
//! - `ArgonParams`: Bounded Argon2id parameter set
//! - `AnnotationSet`: Unordered set of per-field transforms
//! - `FieldValue` / `FieldType`: The canonical primitive vocabulary
//!
//! ### Entities
//! Objects with identity that persists through state changes.
//!
//! **Examples in this domain:**
//! - `KekEntry`: One registry row, identified by `(alias, version)`
//! - `RecordDescriptor`: The static transform table of a record type
//! - `EncryptedRecord`: The parallel encrypted record with its envelope
//!
//! ### Domain Services
//! Stateless operations that do not belong to a single object.
//!
//! **Examples in this domain:**
//! - `services::canonical`: Deterministic byte encoding of field values
//!
//! ### Infrastructure Ports
//! Async traits the infrastructure layer implements against external
//! systems:
//! - `KmsAdapter`: wrap/unwrap capability of the external KMS
//! - `SecretStore`: pepper-only secret storage surface
//! - `KekRepository`: persistent KEK version registry
//!
//! ### Domain Events
//! - `EngineObserver`: single capability value with typed lifecycle
//!   methods; the default implementation is a no-op
//!
//! ## Business Rules and Invariants
//!
//! ### Key Hierarchy Rules
//! - DEKs exist only in memory for the span of one record operation and are
//!   zeroized on every exit path
//! - For any alias, at most one KEK version is active; rotation deprecates
//!   the predecessor but keeps it resolvable forever
//! - External key ids are never reused across versions
//!
//! ### Hash Rules
//! - `hash_basic` is a pure function of `(canonical bytes, pepper)`
//! - `hash_secure` uses a fresh random salt per call and verifies in
//!   constant time
//!
//! ### Dispatch Rules
//! - Combined annotation sets operate on the original plaintext
//!   independently; order within a set is irrelevant
//! - Field failures are accumulated, never short-circuited
//! - Reserved envelope names are skipped

pub mod cancellation;
pub mod entities;
pub mod error;
pub mod events;
pub mod repositories;
pub mod services;
pub mod value_objects;

// Re-export commonly used types for convenient access
// These exports provide a clean API surface for consumers of the domain layer
pub use cancellation::CancellationToken;
pub use entities::{
    is_reserved_field, EncryptedRecord, FieldSpec, KekEntry, PlainField, PlainRecord,
    RecordDescriptor,
};
pub use error::{ProcessingErrors, VaultError};
pub use events::{EngineObserver, EngineOperation, KeyOperationKind, NoopObserver};
pub use repositories::KekRepository;
pub use services::{KmsAdapter, SecretStore};
pub use value_objects::{
    AnnotationSet, ArgonParams, Dek, FieldType, FieldValue, KekAlias, KeyVersion, Pepper,
    Transform,
};
