// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Data Encryption Key
//!
//! This module provides the in-memory representation of a per-record data
//! encryption key with secure memory management. A DEK exists only between
//! its generation at the start of a record operation and the end of that
//! operation; it is never persisted in plaintext.
//!
//! ## Security Features
//!
//! - **Automatic Zeroization**: Key bytes are wiped from memory on drop,
//!   on success and error paths alike
//! - **Fixed Width**: Exactly 32 bytes; any other length is rejected with
//!   `InvalidKey`
//! - **Opaque Debug**: The `Debug` impl never prints key bytes

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::VaultError;

/// Length of a DEK in bytes (AES-256)
pub const DEK_LENGTH: usize = 32;

/// A 32-byte data encryption key, zeroized on drop.
///
/// The engine generates one DEK per `encrypt_record` call and hands it to
/// the dispatcher by reference; ownership stays with the enclosing
/// operation, which guarantees zeroization on every exit path.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Dek {
    bytes: [u8; DEK_LENGTH],
}

impl Dek {
    /// Wraps freshly generated random bytes as a DEK.
    pub fn new(bytes: [u8; DEK_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Adopts unwrapped key material, rejecting any length other than 32.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VaultError> {
        if bytes.len() != DEK_LENGTH {
            return Err(VaultError::invalid_key(format!(
                "DEK must be {} bytes, got {}",
                DEK_LENGTH,
                bytes.len()
            )));
        }
        let mut fixed = [0u8; DEK_LENGTH];
        fixed.copy_from_slice(bytes);
        Ok(Self { bytes: fixed })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for Dek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Dek(..)")
    }
}
