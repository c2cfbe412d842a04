// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # AEAD Primitive
//!
//! This module is part of the Infrastructure layer, providing the concrete
//! authenticated-encryption primitive the engine composes everywhere a
//! field value or a DEK must be protected.
//!
//! ## Algorithm
//!
//! AES-256-GCM with a 96-bit nonce and a 128-bit authentication tag:
//!
//! - **Key Size**: 256 bits (32 bytes); any other length fails with
//!   `InvalidKey`
//! - **Nonce**: 12 bytes drawn per operation from the system CSPRNG
//! - **Output Layout**: `[12-byte nonce][ciphertext][16-byte tag]`
//!
//! ## Security Properties
//!
//! - **Confidentiality**: Data is unreadable without the key
//! - **Integrity**: Any bit flip in nonce, ciphertext, or tag is detected
//! - **Semantic Security**: Identical plaintexts produce different
//!   ciphertexts because every operation draws a fresh nonce
//!
//! Decryption validates the tag before returning anything; every failure
//! mode (short input, corrupted nonce, flipped ciphertext bit, truncated
//! tag) surfaces as `AuthenticationFailed` with no partial plaintext.

use aes_gcm::{AeadInPlace, Aes256Gcm, Key, KeyInit, Nonce};
use ring::rand::{SecureRandom, SystemRandom};

use field_vault_domain::VaultError;

/// AES-GCM nonce length in bytes
pub const NONCE_LENGTH: usize = 12;
/// AES-GCM authentication tag length in bytes
pub const TAG_LENGTH: usize = 16;
/// AES-256 key length in bytes
pub const KEY_LENGTH: usize = 32;

/// Minimum length of a well-formed AEAD blob (empty plaintext)
pub const MIN_CIPHERTEXT_LENGTH: usize = NONCE_LENGTH + TAG_LENGTH;

/// Stateless AES-256-GCM cipher with per-operation random nonces.
///
/// The cipher holds only the CSPRNG handle; keys are passed per call so a
/// single instance serves every DEK the engine ever touches.
pub struct AeadCipher {
    rng: SystemRandom,
}

impl Default for AeadCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl AeadCipher {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    /// Encrypts plaintext under the key, returning `[nonce][ciphertext][tag]`.
    pub fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
        let cipher = self.cipher_for(key)?;

        let mut nonce = [0u8; NONCE_LENGTH];
        self.rng
            .fill(&mut nonce)
            .map_err(|_| VaultError::io_error("failed to generate nonce"))?;

        let mut buffer = plaintext.to_vec();
        cipher
            .encrypt_in_place(Nonce::from_slice(&nonce), b"", &mut buffer)
            .map_err(|_| VaultError::io_error("AES-256-GCM encryption failed"))?;

        let mut result = Vec::with_capacity(NONCE_LENGTH + buffer.len());
        result.extend_from_slice(&nonce);
        result.extend_from_slice(&buffer);
        Ok(result)
    }

    /// Decrypts a `[nonce][ciphertext][tag]` blob, validating the tag before
    /// returning plaintext.
    pub fn decrypt(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, VaultError> {
        let cipher = self.cipher_for(key)?;

        if data.len() < MIN_CIPHERTEXT_LENGTH {
            return Err(VaultError::authentication_failed(format!(
                "ciphertext too short: {} bytes (minimum {})",
                data.len(),
                MIN_CIPHERTEXT_LENGTH
            )));
        }

        let (nonce, ciphertext) = data.split_at(NONCE_LENGTH);
        let mut buffer = ciphertext.to_vec();
        cipher
            .decrypt_in_place(Nonce::from_slice(nonce), b"", &mut buffer)
            .map_err(|_| {
                VaultError::authentication_failed("authentication tag mismatch")
            })?;

        Ok(buffer)
    }

    fn cipher_for(&self, key: &[u8]) -> Result<Aes256Gcm, VaultError> {
        if key.len() != KEY_LENGTH {
            return Err(VaultError::invalid_key(format!(
                "AES-256-GCM requires a {}-byte key, got {}",
                KEY_LENGTH,
                key.len()
            )));
        }
        Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)))
    }
}
