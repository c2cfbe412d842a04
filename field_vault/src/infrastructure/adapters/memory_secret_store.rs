// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # In-Memory Secret Store
//!
//! Concrete `SecretStore` implementation for tests and local development.
//! `store_pepper` has create-or-fail semantics: the insert fails when the
//! alias already holds a value, which is the conflict signal the engine's
//! pepper bootstrap relies on to detect a concurrent construction racing
//! the same alias.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use field_vault_domain::{SecretStore, VaultError};

/// In-memory secret store with create-or-fail inserts.
#[derive(Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, Vec<u8>>>,
    failing: AtomicBool,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a store outage; while set, every operation fails.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Pre-seeds a secret, used by tests that model a pre-existing pepper.
    pub fn seed(&self, alias: &str, value: Vec<u8>) {
        self.secrets.lock().insert(alias.to_string(), value);
    }

    fn check_available(&self) -> Result<(), VaultError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(VaultError::secret_store_failure("secret store unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn pepper_exists(&self, alias: &str) -> Result<bool, VaultError> {
        self.check_available()?;
        Ok(self.secrets.lock().contains_key(alias))
    }

    async fn get_pepper(&self, alias: &str) -> Result<Vec<u8>, VaultError> {
        self.check_available()?;
        self.secrets
            .lock()
            .get(alias)
            .cloned()
            .ok_or_else(|| {
                VaultError::secret_store_failure(format!("no pepper stored for alias '{}'", alias))
            })
    }

    async fn store_pepper(&self, alias: &str, pepper: &[u8]) -> Result<(), VaultError> {
        self.check_available()?;
        let mut secrets = self.secrets.lock();
        if secrets.contains_key(alias) {
            return Err(VaultError::secret_store_failure(format!(
                "pepper already exists for alias '{}'",
                alias
            )));
        }
        secrets.insert(alias.to_string(), pepper.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_read() {
        let store = MemorySecretStore::new();
        assert!(!store.pepper_exists("svc").await.unwrap());

        store.store_pepper("svc", &[0xAB; 32]).await.unwrap();
        assert!(store.pepper_exists("svc").await.unwrap());
        assert_eq!(store.get_pepper("svc").await.unwrap(), vec![0xAB; 32]);
    }

    #[tokio::test]
    async fn test_create_or_fail() {
        let store = MemorySecretStore::new();
        store.store_pepper("svc", &[1; 32]).await.unwrap();

        // Second create must fail and must not overwrite
        assert!(store.store_pepper("svc", &[2; 32]).await.is_err());
        assert_eq!(store.get_pepper("svc").await.unwrap(), vec![1; 32]);
    }

    #[tokio::test]
    async fn test_missing_alias_fails() {
        let store = MemorySecretStore::new();
        assert!(matches!(
            store.get_pepper("missing").await,
            Err(VaultError::SecretStoreFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_outage_toggle() {
        let store = MemorySecretStore::new();
        store.set_failing(true);
        assert!(store.pepper_exists("svc").await.is_err());
        store.set_failing(false);
        assert!(store.pepper_exists("svc").await.is_ok());
    }
}
