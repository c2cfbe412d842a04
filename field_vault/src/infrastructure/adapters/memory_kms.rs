// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # In-Memory KMS Adapter
//!
//! This module is part of the Infrastructure layer, providing a concrete
//! implementation of the `KmsAdapter` port for tests and local development.
//!
//! The adapter behaves like a real envelope-encryption backend rather than
//! a pass-through stub: every created key is a distinct 32-byte master key
//! identified by a UUID-based external id, and wrap/unwrap is genuine
//! AES-256-GCM under that master key. KMS ciphertexts are therefore opaque
//! and tamper-evident, exactly as the engine must assume of a production
//! backend.
//!
//! Creating a key for an alias that already has one repoints the alias to
//! the new key while keeping the old master key resolvable by its external
//! id, which is what lets rotated aliases keep unwrapping historical DEKs.
//!
//! A failure toggle simulates a backend outage for error-path tests; while
//! tripped, every operation fails with a sanitized `KmsFailure`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use ring::rand::{SecureRandom, SystemRandom};
use uuid::Uuid;

use field_vault_domain::{KekAlias, KmsAdapter, VaultError};

use crate::infrastructure::crypto::AeadCipher;

/// In-memory KMS backend with real AES-GCM wrap/unwrap.
pub struct MemoryKms {
    /// external id -> master key
    master_keys: RwLock<HashMap<String, [u8; 32]>>,
    /// alias -> current external id
    aliases: RwLock<HashMap<String, String>>,
    failing: AtomicBool,
    cipher: AeadCipher,
    rng: SystemRandom,
}

impl Default for MemoryKms {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKms {
    pub fn new() -> Self {
        Self {
            master_keys: RwLock::new(HashMap::new()),
            aliases: RwLock::new(HashMap::new()),
            failing: AtomicBool::new(false),
            cipher: AeadCipher::new(),
            rng: SystemRandom::new(),
        }
    }

    /// Simulates a backend outage; while set, every operation fails.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of master keys ever created (rotation keeps old keys)
    pub fn key_count(&self) -> usize {
        self.master_keys.read().len()
    }

    fn check_available(&self) -> Result<(), VaultError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(VaultError::kms_failure("key service unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KmsAdapter for MemoryKms {
    async fn get_key_id(&self, alias: &KekAlias) -> Result<Option<String>, VaultError> {
        self.check_available()?;
        Ok(self.aliases.read().get(alias.as_str()).cloned())
    }

    async fn create_key(&self, alias: &KekAlias) -> Result<String, VaultError> {
        self.check_available()?;

        let mut master = [0u8; 32];
        self.rng
            .fill(&mut master)
            .map_err(|_| VaultError::kms_failure("key generation failed"))?;
        let external_id = format!("mem-kms-{}", Uuid::new_v4());

        self.master_keys
            .write()
            .insert(external_id.clone(), master);
        self.aliases
            .write()
            .insert(alias.as_str().to_string(), external_id.clone());
        Ok(external_id)
    }

    async fn encrypt(&self, external_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
        self.check_available()?;
        let master = *self
            .master_keys
            .read()
            .get(external_id)
            .ok_or_else(|| VaultError::kms_failure("unknown key id"))?;
        self.cipher
            .encrypt(&master, plaintext)
            .map_err(|_| VaultError::kms_failure("wrap operation failed"))
    }

    async fn decrypt(&self, external_id: &str, ciphertext: &[u8]) -> Result<Vec<u8>, VaultError> {
        self.check_available()?;
        let master = *self
            .master_keys
            .read()
            .get(external_id)
            .ok_or_else(|| VaultError::kms_failure("unknown key id"))?;
        self.cipher
            .decrypt(&master, ciphertext)
            .map_err(|_| VaultError::kms_failure("unwrap operation failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias() -> KekAlias {
        KekAlias::new("test-service").unwrap()
    }

    #[tokio::test]
    async fn test_create_then_lookup() {
        let kms = MemoryKms::new();
        assert_eq!(kms.get_key_id(&alias()).await.unwrap(), None);

        let id = kms.create_key(&alias()).await.unwrap();
        assert_eq!(kms.get_key_id(&alias()).await.unwrap(), Some(id));
    }

    #[tokio::test]
    async fn test_wrap_unwrap_round_trip() {
        let kms = MemoryKms::new();
        let id = kms.create_key(&alias()).await.unwrap();

        let dek = [0x77u8; 32];
        let wrapped = kms.encrypt(&id, &dek).await.unwrap();
        assert_ne!(wrapped.as_slice(), dek.as_slice());
        assert_eq!(kms.decrypt(&id, &wrapped).await.unwrap(), dek);
    }

    #[tokio::test]
    async fn test_old_keys_survive_recreation() {
        let kms = MemoryKms::new();
        let old_id = kms.create_key(&alias()).await.unwrap();
        let wrapped = kms.encrypt(&old_id, &[1u8; 32]).await.unwrap();

        let new_id = kms.create_key(&alias()).await.unwrap();
        assert_ne!(old_id, new_id);
        assert_eq!(kms.get_key_id(&alias()).await.unwrap(), Some(new_id));

        // Historical ciphertext still unwraps through the old id
        assert_eq!(kms.decrypt(&old_id, &wrapped).await.unwrap(), vec![1u8; 32]);
        assert_eq!(kms.key_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_id_fails() {
        let kms = MemoryKms::new();
        assert!(matches!(
            kms.encrypt("mem-kms-missing", &[0u8; 32]).await,
            Err(VaultError::KmsFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_tampered_wrap_fails() {
        let kms = MemoryKms::new();
        let id = kms.create_key(&alias()).await.unwrap();
        let mut wrapped = kms.encrypt(&id, &[9u8; 32]).await.unwrap();
        let last = wrapped.len() - 1;
        wrapped[last] ^= 0xFF;
        assert!(matches!(
            kms.decrypt(&id, &wrapped).await,
            Err(VaultError::KmsFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_outage_toggle() {
        let kms = MemoryKms::new();
        let id = kms.create_key(&alias()).await.unwrap();

        kms.set_failing(true);
        assert!(kms.get_key_id(&alias()).await.is_err());
        assert!(kms.encrypt(&id, &[0u8; 32]).await.is_err());

        kms.set_failing(false);
        assert!(kms.encrypt(&id, &[0u8; 32]).await.is_ok());
    }
}
