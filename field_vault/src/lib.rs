// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Field Vault
//!
//! Field-level encryption and hashing engine for structured records, built
//! around envelope key management: each record gets its own 32-byte data
//! encryption key (DEK), and only the DEK is wrapped by a versioned
//! key-encryption key (KEK) held in an external KMS.
//!
//! ## Layers
//!
//! - **Application** (`application`): the `VaultEngine` orchestrator and
//!   the field transform dispatcher.
//! - **Infrastructure** (`infrastructure`): AES-256-GCM primitives (single
//!   shot and streaming), the keyed equality hash, the Argon2id password
//!   hash, in-memory KMS/secret-store adapters, the SQLite KEK registry,
//!   configuration loading, and Prometheus metrics.
//! - **Domain** (`field_vault_domain`, re-exported as [`domain`]): value
//!   objects, entities, ports, events, and the canonical serializer.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use field_vault::application::services::VaultEngine;
//! use field_vault::domain::{
//!     AnnotationSet, CancellationToken, FieldType, FieldValue, PlainRecord, RecordDescriptor,
//!     Transform,
//! };
//! use field_vault::infrastructure::adapters::{MemoryKms, MemorySecretStore};
//! use field_vault::infrastructure::config::EngineConfig;
//! use field_vault::infrastructure::repositories::SqliteKekRepository;
//!
//! # async fn run() -> Result<(), field_vault::domain::VaultError> {
//! let engine = VaultEngine::new(
//!     EngineConfig::default(),
//!     Arc::new(MemoryKms::new()),
//!     Arc::new(MemorySecretStore::new()),
//!     Arc::new(SqliteKekRepository::in_memory().await?),
//! )
//! .await?;
//!
//! let descriptor = RecordDescriptor::new("user-v1").with_field(
//!     "Email",
//!     FieldType::String,
//!     AnnotationSet::encrypt().and(Transform::HashBasic),
//! );
//! let record = PlainRecord::new()
//!     .with_field("Email", FieldValue::String("user@example.com".into()));
//!
//! let token = CancellationToken::new();
//! let encrypted = engine.encrypt_record(&descriptor, &record, &token).await?;
//! let restored = engine.decrypt_record(&descriptor, &encrypted, &token).await?;
//! assert_eq!(record, restored);
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod infrastructure;

/// Re-export of the domain crate for convenient access.
pub use field_vault_domain as domain;

pub use application::services::{VaultEngine, VaultEngineBuilder};
pub use infrastructure::config::EngineConfig;
