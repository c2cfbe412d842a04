// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # KMS Adapter Port
//!
//! This module defines the narrow capability set the engine requires from a
//! key management service. The engine is agnostic to the backend: a cloud
//! KMS, a transit HSM, or an in-memory test stub all satisfy the same four
//! operations.
//!
//! KMS ciphertexts are opaque to the engine. No bit format is imposed on
//! them; the engine stores whatever `encrypt` returns and hands it back to
//! `decrypt` unchanged.
//!
//! This is an infrastructure port: implementations perform blocking network
//! or disk I/O, so the trait is async.

use async_trait::async_trait;

use crate::value_objects::KekAlias;
use crate::VaultError;

/// External key management capability used to wrap and unwrap DEKs.
///
/// Implementations must sanitize their failure messages: a `KmsFailure`
/// surfaced to callers must not leak backend internals (endpoints,
/// request ids, credentials).
#[async_trait]
pub trait KmsAdapter: Send + Sync {
    /// Looks up the external key id held for an alias, `None` when the KMS
    /// has no key for it yet.
    async fn get_key_id(&self, alias: &KekAlias) -> Result<Option<String>, VaultError>;

    /// Creates a new external key for the alias and returns its id. Each
    /// call creates a distinct key; ids are never reused.
    async fn create_key(&self, alias: &KekAlias) -> Result<String, VaultError>;

    /// Encrypts (wraps) plaintext key material under the external key.
    async fn encrypt(&self, external_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, VaultError>;

    /// Decrypts (unwraps) a ciphertext previously produced by `encrypt`
    /// under the same external key.
    async fn decrypt(&self, external_id: &str, ciphertext: &[u8]) -> Result<Vec<u8>, VaultError>;
}
