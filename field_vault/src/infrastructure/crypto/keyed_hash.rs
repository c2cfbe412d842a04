// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Keyed Equality Hash
//!
//! Deterministic keyed hash for searchable equality: SHA-256 over the
//! canonical serialization of the value concatenated with the service
//! pepper, rendered as lowercase hex.
//!
//! The hash is a pure function of `(canonical bytes, pepper)`: identical
//! plaintexts under the same pepper produce byte-equal output, which is what
//! lets a datastore index the companion column and answer equality lookups
//! without ever seeing plaintext. It is not an authenticator and is never
//! used as one.

use sha2::{Digest, Sha256};

use field_vault_domain::Pepper;

/// Length of the hex-encoded hash in characters
pub const HASH_HEX_LENGTH: usize = 64;

/// Computes the keyed equality hash of canonical bytes.
pub fn hash_basic(canonical: &[u8], pepper: &Pepper) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical);
    hasher.update(pepper.as_bytes());
    hex::encode(hasher.finalize())
}
