// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Argon2id Parameter Set
//!
//! Configuration for the memory-hard password hash (`hash_secure`). The
//! parameters are validated against floor values below which the hash stops
//! being memory-hard in any meaningful sense; the defaults follow current
//! OWASP guidance (64 MiB, 3 iterations, 2-way parallelism).
//!
//! # Parameter Bounds
//!
//! | Parameter    | Minimum | Default |
//! |--------------|---------|---------|
//! | memory_kib   | 8192    | 65536   |
//! | iterations   | 1       | 3       |
//! | parallelism  | 1       | 2       |
//! | salt_length  | 8       | 16      |
//! | key_length   | 16      | 32      |
//!
//! Raising parameters is always safe for new hashes: the encoded output is
//! self-describing, so verification re-derives with the parameters recorded
//! in the hash string, not the engine's current configuration.

use serde::{Deserialize, Serialize};

use crate::VaultError;

/// Minimum Argon2 memory cost in KiB (8 MiB)
pub const MIN_MEMORY_KIB: u32 = 8 * 1024;
/// Minimum salt length in bytes
pub const MIN_SALT_LENGTH: u32 = 8;
/// Minimum derived key length in bytes
pub const MIN_KEY_LENGTH: u32 = 16;

/// Validated Argon2id parameters for `hash_secure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgonParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Time cost (number of passes)
    pub iterations: u32,
    /// Degree of parallelism (lanes)
    pub parallelism: u32,
    /// Random salt length in bytes
    pub salt_length: u32,
    /// Derived hash length in bytes
    pub key_length: u32,
}

impl Default for ArgonParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MiB
            iterations: 3,
            parallelism: 2,
            salt_length: 16,
            key_length: 32,
        }
    }
}

impl ArgonParams {
    /// Sets memory cost in KiB
    pub fn with_memory_kib(mut self, memory_kib: u32) -> Self {
        self.memory_kib = memory_kib;
        self
    }

    /// Sets time cost
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets parallelism
    pub fn with_parallelism(mut self, parallelism: u32) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Sets salt length in bytes
    pub fn with_salt_length(mut self, salt_length: u32) -> Self {
        self.salt_length = salt_length;
        self
    }

    /// Sets derived key length in bytes
    pub fn with_key_length(mut self, key_length: u32) -> Self {
        self.key_length = key_length;
        self
    }

    /// Validates every parameter against its floor value.
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.memory_kib < MIN_MEMORY_KIB {
            return Err(VaultError::invalid_config(format!(
                "argon memory_kib must be at least {} KiB, got {}",
                MIN_MEMORY_KIB, self.memory_kib
            )));
        }
        if self.iterations < 1 {
            return Err(VaultError::invalid_config(
                "argon iterations must be at least 1",
            ));
        }
        if self.parallelism < 1 {
            return Err(VaultError::invalid_config(
                "argon parallelism must be at least 1",
            ));
        }
        if self.salt_length < MIN_SALT_LENGTH {
            return Err(VaultError::invalid_config(format!(
                "argon salt_length must be at least {} bytes, got {}",
                MIN_SALT_LENGTH, self.salt_length
            )));
        }
        if self.key_length < MIN_KEY_LENGTH {
            return Err(VaultError::invalid_config(format!(
                "argon key_length must be at least {} bytes, got {}",
                MIN_KEY_LENGTH, self.key_length
            )));
        }
        Ok(())
    }
}
