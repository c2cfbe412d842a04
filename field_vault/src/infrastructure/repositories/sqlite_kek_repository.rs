// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite KEK Repository
//!
//! This module provides the SQLite-based implementation of the KEK version
//! registry. It implements the Repository pattern with SQLite as the
//! underlying embedded transactional store.
//!
//! ## Overview
//!
//! The repository provides:
//!
//! - **ACID Transactions**: Rotation applies its insert and deprecation in
//!   a single transaction, so readers never observe two active versions
//! - **Connection Pooling**: Efficient database connection management
//! - **Schema Management**: Automatic table and index creation
//! - **Conflict Mapping**: A primary-key collision on insert surfaces as
//!   `VersionConflict`, the signal a racing rotation lost
//! - **In-Memory Testing**: `:memory:` constructor for test isolation
//!
//! ## Database Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS kek_versions (
//!     alias TEXT NOT NULL,
//!     version INTEGER NOT NULL,
//!     external_key_id TEXT NOT NULL,
//!     is_deprecated BOOLEAN NOT NULL DEFAULT FALSE,
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     PRIMARY KEY (alias, version)
//! );
//! CREATE INDEX IF NOT EXISTS idx_kek_versions_active
//!     ON kek_versions(alias, is_deprecated, version DESC);
//! ```
//!
//! Rows are only inserted or flagged deprecated, never deleted: any version
//! that has ever wrapped a DEK must stay resolvable.
//!
//! ## Security Considerations
//!
//! - **SQL Injection Prevention**: All queries use parameterized statements
//! - **No Key Material**: The registry holds external key *ids* only;
//!   actual KEKs never leave the KMS

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use field_vault_domain::{KekAlias, KekEntry, KekRepository, KeyVersion, VaultError};

/// SQLite implementation of the KEK version registry.
pub struct SqliteKekRepository {
    pool: SqlitePool,
}

impl SqliteKekRepository {
    /// Creates a repository over an existing pool and ensures the schema.
    pub async fn new(pool: SqlitePool) -> Result<Self, VaultError> {
        let repository = Self { pool };
        repository.ensure_schema().await?;
        Ok(repository)
    }

    /// Opens (creating if missing) a registry database file.
    pub async fn from_path(database_path: &str) -> Result<Self, VaultError> {
        let options = SqliteConnectOptions::from_str(database_path)
            .map_err(|e| {
                VaultError::registry_failure(format!("invalid registry path: {}", e))
            })?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            VaultError::registry_failure(format!("failed to open registry database: {}", e))
        })?;
        Self::new(pool).await
    }

    /// Creates an in-memory registry (useful for testing).
    ///
    /// The pool is pinned to a single connection: every connection to
    /// `:memory:` is a distinct database, so a larger pool would scatter
    /// the schema and the rows across databases.
    pub async fn in_memory() -> Result<Self, VaultError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .map_err(|e| {
                VaultError::registry_failure(format!(
                    "failed to create in-memory registry: {}",
                    e
                ))
            })?;
        Self::new(pool).await
    }

    /// Ensures the table and the active-lookup index exist.
    async fn ensure_schema(&self) -> Result<(), VaultError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kek_versions (
                alias TEXT NOT NULL,
                version INTEGER NOT NULL,
                external_key_id TEXT NOT NULL,
                is_deprecated BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (alias, version)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| VaultError::registry_failure(format!("failed to create table: {}", e)))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_kek_versions_active
                ON kek_versions(alias, is_deprecated, version DESC)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| VaultError::registry_failure(format!("failed to create index: {}", e)))?;

        debug!("kek_versions schema ensured");
        Ok(())
    }

    fn map_insert_error(error: sqlx::Error, alias: &KekAlias, version: KeyVersion) -> VaultError {
        if let sqlx::Error::Database(db) = &error {
            if db.kind() == sqlx::error::ErrorKind::UniqueViolation {
                return VaultError::VersionConflict {
                    alias: alias.as_str().to_string(),
                    version: version.value(),
                };
            }
        }
        VaultError::registry_failure(format!("failed to insert version row: {}", error))
    }

    fn entry_from_row(row: &SqliteRow) -> Result<KekEntry, VaultError> {
        let alias: String = row
            .try_get("alias")
            .map_err(|e| VaultError::registry_failure(format!("bad alias column: {}", e)))?;
        let version: i64 = row
            .try_get("version")
            .map_err(|e| VaultError::registry_failure(format!("bad version column: {}", e)))?;
        let external_key_id: String = row.try_get("external_key_id").map_err(|e| {
            VaultError::registry_failure(format!("bad external_key_id column: {}", e))
        })?;
        let is_deprecated: bool = row.try_get("is_deprecated").map_err(|e| {
            VaultError::registry_failure(format!("bad is_deprecated column: {}", e))
        })?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| VaultError::registry_failure(format!("bad created_at column: {}", e)))?;
        let updated_at: DateTime<Utc> = row
            .try_get("updated_at")
            .map_err(|e| VaultError::registry_failure(format!("bad updated_at column: {}", e)))?;

        Ok(KekEntry::new(
            KekAlias::new(alias)?,
            KeyVersion::new(version)?,
            external_key_id,
            is_deprecated,
            created_at,
            updated_at,
        ))
    }
}

#[async_trait]
impl KekRepository for SqliteKekRepository {
    async fn current_version(&self, alias: &KekAlias) -> Result<Option<KeyVersion>, VaultError> {
        let row = sqlx::query(
            r#"
            SELECT version FROM kek_versions
            WHERE alias = ? AND is_deprecated = FALSE
            ORDER BY version DESC
            LIMIT 1
            "#,
        )
        .bind(alias.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| VaultError::registry_failure(format!("failed to read current version: {}", e)))?;

        match row {
            Some(row) => {
                let version: i64 = row.try_get("version").map_err(|e| {
                    VaultError::registry_failure(format!("bad version column: {}", e))
                })?;
                Ok(Some(KeyVersion::new(version)?))
            }
            None => Ok(None),
        }
    }

    async fn resolve(&self, alias: &KekAlias, version: KeyVersion) -> Result<String, VaultError> {
        let row = sqlx::query(
            r#"
            SELECT external_key_id FROM kek_versions
            WHERE alias = ? AND version = ?
            "#,
        )
        .bind(alias.as_str())
        .bind(version.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| VaultError::registry_failure(format!("failed to resolve version: {}", e)))?;

        match row {
            Some(row) => row.try_get("external_key_id").map_err(|e| {
                VaultError::registry_failure(format!("bad external_key_id column: {}", e))
            }),
            None => Err(VaultError::UnknownKeyVersion {
                alias: alias.as_str().to_string(),
                version: version.value(),
            }),
        }
    }

    async fn record_new(
        &self,
        alias: &KekAlias,
        version: KeyVersion,
        external_key_id: &str,
    ) -> Result<(), VaultError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO kek_versions
                (alias, version, external_key_id, is_deprecated, created_at, updated_at)
            VALUES (?, ?, ?, FALSE, ?, ?)
            "#,
        )
        .bind(alias.as_str())
        .bind(version.value())
        .bind(external_key_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_insert_error(e, alias, version))?;

        debug!(alias = alias.as_str(), version = version.value(), "recorded new KEK version");
        Ok(())
    }

    async fn deprecate(&self, alias: &KekAlias, version: KeyVersion) -> Result<(), VaultError> {
        let result = sqlx::query(
            r#"
            UPDATE kek_versions
            SET is_deprecated = TRUE, updated_at = ?
            WHERE alias = ? AND version = ?
            "#,
        )
        .bind(Utc::now())
        .bind(alias.as_str())
        .bind(version.value())
        .execute(&self.pool)
        .await
        .map_err(|e| VaultError::registry_failure(format!("failed to deprecate version: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(VaultError::UnknownKeyVersion {
                alias: alias.as_str().to_string(),
                version: version.value(),
            });
        }
        Ok(())
    }

    async fn rotate_to(
        &self,
        alias: &KekAlias,
        new_version: KeyVersion,
        external_key_id: &str,
    ) -> Result<(), VaultError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(|e| {
            VaultError::registry_failure(format!("failed to begin rotation transaction: {}", e))
        })?;

        sqlx::query(
            r#"
            INSERT INTO kek_versions
                (alias, version, external_key_id, is_deprecated, created_at, updated_at)
            VALUES (?, ?, ?, FALSE, ?, ?)
            "#,
        )
        .bind(alias.as_str())
        .bind(new_version.value())
        .bind(external_key_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| Self::map_insert_error(e, alias, new_version))?;

        sqlx::query(
            r#"
            UPDATE kek_versions
            SET is_deprecated = TRUE, updated_at = ?
            WHERE alias = ? AND version < ? AND is_deprecated = FALSE
            "#,
        )
        .bind(now)
        .bind(alias.as_str())
        .bind(new_version.value())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            VaultError::registry_failure(format!("failed to deprecate predecessors: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            VaultError::registry_failure(format!("failed to commit rotation: {}", e))
        })?;

        debug!(alias = alias.as_str(), version = new_version.value(), "rotated KEK version");
        Ok(())
    }

    async fn find_active(&self, alias: &KekAlias) -> Result<Option<KekEntry>, VaultError> {
        let row = sqlx::query(
            r#"
            SELECT alias, version, external_key_id, is_deprecated, created_at, updated_at
            FROM kek_versions
            WHERE alias = ? AND is_deprecated = FALSE
            ORDER BY version DESC
            LIMIT 1
            "#,
        )
        .bind(alias.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| VaultError::registry_failure(format!("failed to find active version: {}", e)))?;

        row.as_ref().map(Self::entry_from_row).transpose()
    }

    async fn list_versions(&self, alias: &KekAlias) -> Result<Vec<KekEntry>, VaultError> {
        let rows = sqlx::query(
            r#"
            SELECT alias, version, external_key_id, is_deprecated, created_at, updated_at
            FROM kek_versions
            WHERE alias = ?
            ORDER BY version DESC
            "#,
        )
        .bind(alias.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| VaultError::registry_failure(format!("failed to list versions: {}", e)))?;

        rows.iter().map(Self::entry_from_row).collect()
    }
}
