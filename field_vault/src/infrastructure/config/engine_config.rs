// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Configuration
//!
//! Configuration surface of the engine: the KEK alias, the pepper alias,
//! the Argon2id parameter set, and the registry database path. Values come
//! from a TOML file or are assembled programmatically with the builder
//! methods; a missing file falls back to defaults with a warning rather
//! than failing startup.
//!
//! Validation enforces the alias charset and length rules and the Argon
//! parameter floors before any engine is constructed from the values.
//!
//! Configuration files must not contain secrets: the pepper lives in the
//! secret store and the KEKs live in the KMS; this file only names them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use field_vault_domain::{ArgonParams, KekAlias, VaultError};

fn default_kek_alias() -> String {
    "field-vault".to_string()
}

fn default_pepper_alias() -> String {
    "field-vault-pepper".to_string()
}

fn default_registry_path() -> String {
    "field_vault.db".to_string()
}

/// Engine configuration loaded from TOML or built programmatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Alias the KMS holds the KEK under
    pub kek_alias: String,
    /// Alias the secret store holds the pepper under
    pub pepper_alias: String,
    /// Argon2id parameters for `hash_secure`
    pub argon: ArgonParams,
    /// Path of the SQLite KEK registry database
    pub registry_path: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kek_alias: default_kek_alias(),
            pepper_alias: default_pepper_alias(),
            argon: ArgonParams::default(),
            registry_path: default_registry_path(),
        }
    }
}

impl EngineConfig {
    /// Sets the KEK alias
    pub fn with_kek_alias(mut self, alias: impl Into<String>) -> Self {
        self.kek_alias = alias.into();
        self
    }

    /// Sets the pepper alias
    pub fn with_pepper_alias(mut self, alias: impl Into<String>) -> Self {
        self.pepper_alias = alias.into();
        self
    }

    /// Sets the Argon2id parameters
    pub fn with_argon(mut self, argon: ArgonParams) -> Self {
        self.argon = argon;
        self
    }

    /// Sets the registry database path
    pub fn with_registry_path(mut self, path: impl Into<String>) -> Self {
        self.registry_path = path.into();
        self
    }

    /// Validates aliases, Argon parameters, and the registry path.
    pub fn validate(&self) -> Result<(), VaultError> {
        KekAlias::validate(&self.kek_alias)
            .map_err(|e| VaultError::invalid_config(format!("kek_alias: {}", e)))?;
        KekAlias::validate(&self.pepper_alias)
            .map_err(|e| VaultError::invalid_config(format!("pepper_alias: {}", e)))?;
        self.argon.validate()?;
        if self.registry_path.is_empty() {
            return Err(VaultError::invalid_config("registry_path must not be empty"));
        }
        Ok(())
    }

    /// Loads configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub async fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, VaultError> {
        let config_path = config_path.as_ref();

        if !config_path.exists() {
            warn!(
                "engine config not found at {:?}, using defaults",
                config_path
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).await.map_err(|e| {
            VaultError::io_error(format!("failed to read config {:?}: {}", config_path, e))
        })?;

        let config: EngineConfig = toml::from_str(&content).map_err(|e| {
            VaultError::invalid_config(format!("failed to parse config {:?}: {}", config_path, e))
        })?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.kek_alias, "field-vault");
        assert_eq!(config.pepper_alias, "field-vault-pepper");
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_kek_alias("payments")
            .with_pepper_alias("payments-pepper")
            .with_registry_path("/var/lib/vault/registry.db");
        assert_eq!(config.kek_alias, "payments");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_alias_rejected() {
        assert!(EngineConfig::default()
            .with_kek_alias("bad alias!")
            .validate()
            .is_err());
        assert!(EngineConfig::default()
            .with_pepper_alias("")
            .validate()
            .is_err());
    }

    #[test]
    fn test_bad_argon_rejected() {
        let config = EngineConfig::default()
            .with_argon(ArgonParams::default().with_memory_kib(16));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_parsing() {
        let parsed: EngineConfig = toml::from_str(
            r#"
            kek_alias = "customer-data"
            pepper_alias = "customer-pepper"
            registry_path = "registry.db"

            [argon]
            memory_kib = 32768
            iterations = 2
            parallelism = 1
            salt_length = 16
            key_length = 32
            "#,
        )
        .unwrap();
        assert_eq!(parsed.kek_alias, "customer-data");
        assert_eq!(parsed.argon.memory_kib, 32768);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: EngineConfig = toml::from_str(r#"kek_alias = "only-this""#).unwrap();
        assert_eq!(parsed.kek_alias, "only-this");
        assert_eq!(parsed.pepper_alias, "field-vault-pepper");
        assert_eq!(parsed.argon, ArgonParams::default());
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_defaults() {
        let config = EngineConfig::load_from_file("/nonexistent/engine.toml")
            .await
            .unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
