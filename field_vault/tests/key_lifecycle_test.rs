// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Key Lifecycle Tests
//!
//! Exercises the KEK state machine end to end: the bootstrap matrix
//! (KMS-has-key × registry-empty), rotation chains, conflict semantics
//! under concurrent rotation, and the file-backed registry.

use std::sync::Arc;

use futures::future::join_all;
use tempfile::tempdir;

use field_vault::application::services::VaultEngine;
use field_vault::domain::{
    AnnotationSet, ArgonParams, CancellationToken, FieldType, FieldValue, KekAlias,
    KekRepository, KeyVersion, KmsAdapter, PlainRecord, RecordDescriptor, VaultError,
};
use field_vault::infrastructure::adapters::{MemoryKms, MemorySecretStore};
use field_vault::infrastructure::config::EngineConfig;
use field_vault::infrastructure::repositories::SqliteKekRepository;

fn fast_config() -> EngineConfig {
    EngineConfig::default().with_argon(
        ArgonParams::default()
            .with_memory_kib(8192)
            .with_iterations(1)
            .with_parallelism(1),
    )
}

fn alias() -> KekAlias {
    KekAlias::new("field-vault").unwrap()
}

fn descriptor() -> RecordDescriptor {
    RecordDescriptor::new("note-v1").with_field("Body", FieldType::String, AnnotationSet::encrypt())
}

fn record(body: &str) -> PlainRecord {
    PlainRecord::new().with_field("Body", FieldValue::String(body.into()))
}

async fn build_engine(
    kms: &Arc<MemoryKms>,
    secret_store: &Arc<MemorySecretStore>,
    registry: &Arc<SqliteKekRepository>,
) -> VaultEngine {
    VaultEngine::new(
        fast_config(),
        kms.clone(),
        secret_store.clone(),
        registry.clone(),
    )
    .await
    .unwrap()
}

/// Bootstrap case 1: nothing exists, so a key is created and recorded as
/// version 1.
#[tokio::test]
async fn bootstrap_creates_initial_version() {
    let kms = Arc::new(MemoryKms::new());
    let secret_store = Arc::new(MemorySecretStore::new());
    let registry = Arc::new(SqliteKekRepository::in_memory().await.unwrap());

    build_engine(&kms, &secret_store, &registry).await;

    assert_eq!(kms.key_count(), 1);
    assert_eq!(
        registry.current_version(&alias()).await.unwrap(),
        Some(KeyVersion::INITIAL)
    );
    let external = registry.resolve(&alias(), KeyVersion::INITIAL).await.unwrap();
    assert_eq!(kms.get_key_id(&alias()).await.unwrap(), Some(external));
}

/// Bootstrap case 2: the KMS already holds a key but the registry is empty
/// and the existing external id is adopted as version 1; no new key is made.
#[tokio::test]
async fn bootstrap_adopts_existing_kms_key() {
    let kms = Arc::new(MemoryKms::new());
    let secret_store = Arc::new(MemorySecretStore::new());
    let registry = Arc::new(SqliteKekRepository::in_memory().await.unwrap());

    let preexisting = kms.create_key(&alias()).await.unwrap();
    build_engine(&kms, &secret_store, &registry).await;

    assert_eq!(kms.key_count(), 1);
    assert_eq!(
        registry.resolve(&alias(), KeyVersion::INITIAL).await.unwrap(),
        preexisting
    );
}

/// Bootstrap case 3: both sides exist, and a second construction changes
/// nothing.
#[tokio::test]
async fn bootstrap_is_idempotent() {
    let kms = Arc::new(MemoryKms::new());
    let secret_store = Arc::new(MemorySecretStore::new());
    let registry = Arc::new(SqliteKekRepository::in_memory().await.unwrap());

    build_engine(&kms, &secret_store, &registry).await;
    let external_before = registry.resolve(&alias(), KeyVersion::INITIAL).await.unwrap();

    build_engine(&kms, &secret_store, &registry).await;

    assert_eq!(kms.key_count(), 1);
    assert_eq!(
        registry.resolve(&alias(), KeyVersion::INITIAL).await.unwrap(),
        external_before
    );
    assert_eq!(registry.list_versions(&alias()).await.unwrap().len(), 1);
}

/// Rotation chains: every rotation bumps the version by one, deprecates the
/// predecessor, and keeps every historical version resolvable.
#[tokio::test]
async fn rotation_chain() {
    let kms = Arc::new(MemoryKms::new());
    let secret_store = Arc::new(MemorySecretStore::new());
    let registry = Arc::new(SqliteKekRepository::in_memory().await.unwrap());
    let engine = build_engine(&kms, &secret_store, &registry).await;
    let token = CancellationToken::new();

    let mut encrypted_per_version = vec![
        engine
            .encrypt_record(&descriptor(), &record("v1 data"), &token)
            .await
            .unwrap(),
    ];

    for expected in 2..=4i64 {
        let version = engine.rotate_kek(&token).await.unwrap();
        assert_eq!(version.value(), expected);
        encrypted_per_version.push(
            engine
                .encrypt_record(&descriptor(), &record("data"), &token)
                .await
                .unwrap(),
        );
    }

    assert_eq!(kms.key_count(), 4);
    let versions = registry.list_versions(&alias()).await.unwrap();
    assert_eq!(versions.len(), 4);
    assert!(versions.iter().filter(|v| !v.is_deprecated()).count() == 1);

    // External ids are never reused across versions
    let mut ids: Vec<_> = versions.iter().map(|v| v.external_key_id().to_string()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);

    // Every historical record still decrypts
    for encrypted in &encrypted_per_version {
        engine
            .decrypt_record(&descriptor(), encrypted, &token)
            .await
            .unwrap();
    }
}

/// Two engines over shared infrastructure observe each other's rotations:
/// records wrapped under the old version keep decrypting everywhere.
#[tokio::test]
async fn rotation_visible_across_engines() {
    let kms = Arc::new(MemoryKms::new());
    let secret_store = Arc::new(MemorySecretStore::new());
    let registry = Arc::new(SqliteKekRepository::in_memory().await.unwrap());
    let token = CancellationToken::new();

    let writer = build_engine(&kms, &secret_store, &registry).await;
    let reader = build_engine(&kms, &secret_store, &registry).await;

    let old = writer
        .encrypt_record(&descriptor(), &record("before rotation"), &token)
        .await
        .unwrap();
    writer.rotate_kek(&token).await.unwrap();

    // The other engine decrypts the pre-rotation record and stamps the new
    // version on fresh encrypts
    let restored = reader
        .decrypt_record(&descriptor(), &old, &token)
        .await
        .unwrap();
    assert_eq!(
        restored.get("Body"),
        Some(&FieldValue::String("before rotation".into()))
    );

    let fresh = reader
        .encrypt_record(&descriptor(), &record("after"), &token)
        .await
        .unwrap();
    assert_eq!(fresh.key_version(), Some(KeyVersion::INITIAL.next()));
}

/// The loser of a rotation race gets `VersionConflict` and the registry
/// stays consistent; a retry lands on the next version.
#[tokio::test]
async fn concurrent_rotation_conflict() {
    let kms = Arc::new(MemoryKms::new());
    let secret_store = Arc::new(MemorySecretStore::new());
    let registry = Arc::new(SqliteKekRepository::in_memory().await.unwrap());
    let engine = build_engine(&kms, &secret_store, &registry).await;
    let token = CancellationToken::new();

    // Both contenders observed version 1; the engine commits v2 first
    engine.rotate_kek(&token).await.unwrap();
    let stale_target = KeyVersion::INITIAL.next();
    let late_key = kms.create_key(&alias()).await.unwrap();
    let conflict = registry
        .rotate_to(&alias(), stale_target, &late_key)
        .await
        .unwrap_err();
    assert!(matches!(conflict, VaultError::VersionConflict { version: 2, .. }));

    // Retrying after re-reading the current version succeeds
    let retry_version = registry
        .current_version(&alias())
        .await
        .unwrap()
        .unwrap()
        .next();
    registry
        .rotate_to(&alias(), retry_version, &late_key)
        .await
        .unwrap();
    assert_eq!(
        registry.current_version(&alias()).await.unwrap(),
        Some(retry_version)
    );
}

/// Concurrent encrypts share the engine safely and all land on a valid
/// version; everything decrypts afterwards.
#[tokio::test]
async fn concurrent_encrypts() {
    let kms = Arc::new(MemoryKms::new());
    let secret_store = Arc::new(MemorySecretStore::new());
    let registry = Arc::new(SqliteKekRepository::in_memory().await.unwrap());
    let engine = Arc::new(build_engine(&kms, &secret_store, &registry).await);
    let token = CancellationToken::new();

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let engine = engine.clone();
            let token = token.clone();
            async move {
                engine
                    .encrypt_record(&descriptor(), &record(&format!("payload {i}")), &token)
                    .await
            }
        })
        .collect();

    let results = join_all(tasks).await;
    for (i, result) in results.into_iter().enumerate() {
        let encrypted = result.unwrap();
        assert_eq!(encrypted.key_version(), Some(KeyVersion::INITIAL));
        let restored = engine
            .decrypt_record(&descriptor(), &encrypted, &token)
            .await
            .unwrap();
        assert_eq!(
            restored.get("Body"),
            Some(&FieldValue::String(format!("payload {i}")))
        );
    }
}

/// The registry survives on disk: a second process (engine + repository
/// instance) over the same database file sees the recorded versions.
#[tokio::test]
async fn file_backed_registry_persists() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("registry.db");
    let db_path = db_path.to_str().unwrap();

    let kms = Arc::new(MemoryKms::new());
    let secret_store = Arc::new(MemorySecretStore::new());
    let token = CancellationToken::new();

    let encrypted = {
        let registry = Arc::new(SqliteKekRepository::from_path(db_path).await.unwrap());
        let engine = build_engine(&kms, &secret_store, &registry).await;
        engine.rotate_kek(&token).await.unwrap();
        engine
            .encrypt_record(&descriptor(), &record("durable"), &token)
            .await
            .unwrap()
    };

    // Fresh repository over the same file: versions are still there
    let registry = Arc::new(SqliteKekRepository::from_path(db_path).await.unwrap());
    assert_eq!(
        registry.current_version(&alias()).await.unwrap(),
        Some(KeyVersion::INITIAL.next())
    );

    let engine = build_engine(&kms, &secret_store, &registry).await;
    let restored = engine
        .decrypt_record(&descriptor(), &encrypted, &token)
        .await
        .unwrap();
    assert_eq!(restored.get("Body"), Some(&FieldValue::String("durable".into())));
}
