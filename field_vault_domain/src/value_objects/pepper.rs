// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Service Pepper
//!
//! A 32-byte service-wide secret mixed into every hash input. The pepper is
//! loaded (or created) once per engine instance against the secret store and
//! is immutable for the lifetime of the engine; it is read-only after
//! construction, so no synchronization is required beyond initial
//! publication.
//!
//! A zero-valued pepper is rejected: it is indistinguishable from
//! uninitialized memory and would silently disable the keyed property of
//! `hash_basic`.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::VaultError;

/// Length of the pepper in bytes
pub const PEPPER_LENGTH: usize = 32;

/// A validated 32-byte pepper, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Pepper {
    bytes: [u8; PEPPER_LENGTH],
}

impl Pepper {
    /// Adopts pepper bytes from the secret store or a fresh generation,
    /// rejecting wrong lengths and the all-zero value.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VaultError> {
        if bytes.len() != PEPPER_LENGTH {
            return Err(VaultError::invalid_config(format!(
                "pepper must be {} bytes, got {}",
                PEPPER_LENGTH,
                bytes.len()
            )));
        }
        if bytes.iter().all(|b| *b == 0) {
            return Err(VaultError::invalid_config(
                "pepper must not be all-zero",
            ));
        }
        let mut fixed = [0u8; PEPPER_LENGTH];
        fixed.copy_from_slice(bytes);
        Ok(Self { bytes: fixed })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for Pepper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Pepper(..)")
    }
}
