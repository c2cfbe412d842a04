// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Envelope Orchestrator
//!
//! `VaultEngine` is the per-record coordinator of the whole machine. For an
//! encrypt it allocates a fresh DEK, drives the field transform dispatcher,
//! wraps the DEK under the current KEK via the KMS, stamps the KEK version
//! into the envelope, and guarantees the plaintext DEK is zeroized on every
//! exit path. Decrypt reverses the envelope: it resolves the stamped
//! version, unwraps the DEK, and drives the dispatcher backwards.
//!
//! ## Construction
//!
//! The engine is built by explicit dependency injection: KMS adapter,
//! secret store, and KEK repository are handed in; there is no process-wide
//! state. Construction performs the two bootstrap state machines:
//!
//! - **Pepper**: probe the secret store; adopt the stored pepper or create
//!   one with conflict detection, so concurrent constructions on the same
//!   alias converge on one pepper or fail loudly.
//! - **KEK**: reconcile the KMS and the registry; a brand-new alias gets a
//!   key created and recorded as version 1, an existing KMS key with an
//!   empty registry is adopted as version 1, and a fully bootstrapped alias
//!   is left alone.
//!
//! After construction the engine is a thread-safe passive object; callers
//! may invoke it from multiple threads concurrently. The secret store is
//! only used during construction; the pepper is immutable afterwards.
//!
//! ## Ordering Guarantees
//!
//! Within one `encrypt_record` call every field transform observes the same
//! DEK and the same KEK version. After `rotate_kek` returns, subsequent
//! encrypts use the new version; encrypts already in flight may finish on
//! the old version, which stays decryptable forever.
//!
//! ## Failure Semantics
//!
//! Field-level failures are aggregated into `ProcessingErrors` and the
//! partial encrypted record is never exposed. Cancellation is observed at
//! every I/O boundary and returns `Cancelled` without partial persistence.

use std::sync::Arc;
use std::time::Instant;

use ring::rand::{SecureRandom, SystemRandom};
use tracing::{debug, info};
use zeroize::{Zeroize, Zeroizing};

use field_vault_domain::services::canonical;
use field_vault_domain::value_objects::DEK_LENGTH;
use field_vault_domain::{
    ArgonParams, CancellationToken, Dek, EncryptedRecord, EngineObserver, EngineOperation,
    FieldValue, KekAlias, KekRepository, KeyOperationKind, KeyVersion, KmsAdapter, NoopObserver,
    Pepper, PlainRecord, RecordDescriptor, SecretStore, VaultError,
};

use crate::application::services::dispatcher::{
    self, validate_shape, TransformContext,
};
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::crypto::{keyed_hash, password_hash, AeadCipher};
use crate::infrastructure::metrics::MetricsService;

/// Builder for [`VaultEngine`]; required collaborators are constructor
/// arguments, optional ones have `with_*` setters.
pub struct VaultEngineBuilder {
    config: EngineConfig,
    kms: Arc<dyn KmsAdapter>,
    secret_store: Arc<dyn SecretStore>,
    registry: Arc<dyn KekRepository>,
    observer: Option<Arc<dyn EngineObserver>>,
    metrics: Option<Arc<MetricsService>>,
}

impl VaultEngineBuilder {
    pub fn new(
        config: EngineConfig,
        kms: Arc<dyn KmsAdapter>,
        secret_store: Arc<dyn SecretStore>,
        registry: Arc<dyn KekRepository>,
    ) -> Self {
        Self {
            config,
            kms,
            secret_store,
            registry,
            observer: None,
            metrics: None,
        }
    }

    /// Installs an observer; the default ignores every event.
    pub fn with_observer(mut self, observer: Arc<dyn EngineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Installs a shared metrics service; the default is a fresh registry.
    pub fn with_metrics(mut self, metrics: Arc<MetricsService>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validates configuration, resolves the pepper, bootstraps the KEK,
    /// and returns a ready engine.
    pub async fn build(self) -> Result<VaultEngine, VaultError> {
        self.config.validate()?;
        let kek_alias = KekAlias::new(self.config.kek_alias.clone())?;
        let rng = SystemRandom::new();

        let pepper =
            resolve_pepper(self.secret_store.as_ref(), &self.config.pepper_alias, &rng).await?;

        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(NoopObserver));
        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => Arc::new(MetricsService::new()?),
        };

        bootstrap_kek(
            self.kms.as_ref(),
            self.registry.as_ref(),
            &kek_alias,
            observer.as_ref(),
        )
        .await?;

        info!(alias = kek_alias.as_str(), "vault engine ready");
        Ok(VaultEngine {
            kek_alias,
            argon: self.config.argon,
            pepper,
            kms: self.kms,
            registry: self.registry,
            aead: AeadCipher::new(),
            rng,
            observer,
            metrics,
        })
    }
}

/// The field-level encryption engine.
pub struct VaultEngine {
    kek_alias: KekAlias,
    argon: ArgonParams,
    pepper: Pepper,
    kms: Arc<dyn KmsAdapter>,
    registry: Arc<dyn KekRepository>,
    aead: AeadCipher,
    rng: SystemRandom,
    observer: Arc<dyn EngineObserver>,
    metrics: Arc<MetricsService>,
}

impl VaultEngine {
    /// Builds an engine with default observer and metrics.
    pub async fn new(
        config: EngineConfig,
        kms: Arc<dyn KmsAdapter>,
        secret_store: Arc<dyn SecretStore>,
        registry: Arc<dyn KekRepository>,
    ) -> Result<Self, VaultError> {
        VaultEngineBuilder::new(config, kms, secret_store, registry)
            .build()
            .await
    }

    /// Starts a builder for optional collaborators.
    pub fn builder(
        config: EngineConfig,
        kms: Arc<dyn KmsAdapter>,
        secret_store: Arc<dyn SecretStore>,
        registry: Arc<dyn KekRepository>,
    ) -> VaultEngineBuilder {
        VaultEngineBuilder::new(config, kms, secret_store, registry)
    }

    pub fn kek_alias(&self) -> &KekAlias {
        &self.kek_alias
    }

    /// The immutable service pepper adopted at construction.
    pub fn pepper(&self) -> &Pepper {
        &self.pepper
    }

    /// Encrypts a record into its parallel encrypted form.
    ///
    /// The caller's record is never mutated; on any failure no partial
    /// encrypted record is returned and the DEK is zeroized.
    pub async fn encrypt_record(
        &self,
        descriptor: &RecordDescriptor,
        record: &PlainRecord,
        token: &CancellationToken,
    ) -> Result<EncryptedRecord, VaultError> {
        let started = Instant::now();
        self.observer
            .on_operation_started(EngineOperation::EncryptRecord, descriptor.schema_id());

        match self.encrypt_record_inner(descriptor, record, token).await {
            Ok(encrypted) => {
                let elapsed = started.elapsed();
                self.metrics.record_encrypt(elapsed.as_secs_f64());
                self.observer.on_operation_completed(
                    EngineOperation::EncryptRecord,
                    descriptor.schema_id(),
                    encrypted.companion_count(),
                    elapsed,
                );
                debug!(
                    schema = descriptor.schema_id(),
                    companions = encrypted.companion_count(),
                    "record encrypted"
                );
                Ok(encrypted)
            }
            Err(e) => {
                self.metrics.record_error(e.category());
                self.observer
                    .on_error(EngineOperation::EncryptRecord, e.category());
                Err(e)
            }
        }
    }

    async fn encrypt_record_inner(
        &self,
        descriptor: &RecordDescriptor,
        record: &PlainRecord,
        token: &CancellationToken,
    ) -> Result<EncryptedRecord, VaultError> {
        token.check("encrypt_record")?;
        validate_shape(descriptor, record)?;

        let dek = self.generate_dek()?;

        let context = TransformContext {
            dek: &dek,
            pepper: &self.pepper,
            argon: &self.argon,
            aead: &self.aead,
            metrics: &self.metrics,
        };
        let (mut encrypted, errors) = dispatcher::encrypt_fields(&context, descriptor, record);
        errors.into_result()?;

        token.check("kek lookup")?;
        let active = self
            .registry
            .find_active(&self.kek_alias)
            .await?
            .ok_or_else(|| {
                VaultError::registry_failure(format!(
                    "no active KEK for alias '{}'",
                    self.kek_alias
                ))
            })?;

        token.check("dek wrap")?;
        let wrapped = self
            .kms
            .encrypt(active.external_key_id(), dek.as_bytes())
            .await?;
        self.observer.on_key_operation(
            KeyOperationKind::Wrap,
            self.kek_alias.as_str(),
            active.version().value(),
        );
        self.metrics.record_key_operation("wrap");

        encrypted.set_envelope(wrapped, active.version());
        encrypted.set_metadata(descriptor.schema_id());
        Ok(encrypted)
        // `dek` drops here (and on every early return), zeroizing itself
    }

    /// Decrypts the `encrypt` companions of an encrypted record back into
    /// a plaintext record. Hash companions are one-way and come back as
    /// empty source fields.
    pub async fn decrypt_record(
        &self,
        descriptor: &RecordDescriptor,
        encrypted: &EncryptedRecord,
        token: &CancellationToken,
    ) -> Result<PlainRecord, VaultError> {
        let started = Instant::now();
        self.observer
            .on_operation_started(EngineOperation::DecryptRecord, descriptor.schema_id());

        match self.decrypt_record_inner(descriptor, encrypted, token).await {
            Ok(record) => {
                let elapsed = started.elapsed();
                self.metrics.record_decrypt(elapsed.as_secs_f64());
                self.observer.on_operation_completed(
                    EngineOperation::DecryptRecord,
                    descriptor.schema_id(),
                    record.len(),
                    elapsed,
                );
                Ok(record)
            }
            Err(e) => {
                self.metrics.record_error(e.category());
                self.observer
                    .on_error(EngineOperation::DecryptRecord, e.category());
                Err(e)
            }
        }
    }

    async fn decrypt_record_inner(
        &self,
        descriptor: &RecordDescriptor,
        encrypted: &EncryptedRecord,
        token: &CancellationToken,
    ) -> Result<PlainRecord, VaultError> {
        token.check("decrypt_record")?;
        let version = encrypted.key_version().ok_or_else(|| {
            VaultError::invalid_config("encrypted record is missing its KeyVersion")
        })?;

        let external_id = self.registry.resolve(&self.kek_alias, version).await?;

        token.check("dek unwrap")?;
        let raw_dek = Zeroizing::new(
            self.kms
                .decrypt(&external_id, encrypted.dek_encrypted())
                .await?,
        );
        let dek = Dek::from_bytes(&raw_dek)?;
        self.observer.on_key_operation(
            KeyOperationKind::Unwrap,
            self.kek_alias.as_str(),
            version.value(),
        );
        self.metrics.record_key_operation("unwrap");

        let context = TransformContext {
            dek: &dek,
            pepper: &self.pepper,
            argon: &self.argon,
            aead: &self.aead,
            metrics: &self.metrics,
        };
        let (record, errors) = dispatcher::decrypt_fields(&context, descriptor, encrypted);
        errors.into_result()?;
        Ok(record)
    }

    /// Rotates the alias to a new KEK version.
    ///
    /// Creates a new external key, records `current + 1`, and deprecates
    /// the predecessor in one registry transaction. A concurrent rotation
    /// losing the insert race surfaces as `VersionConflict`; historical
    /// versions remain decryptable indefinitely.
    pub async fn rotate_kek(&self, token: &CancellationToken) -> Result<KeyVersion, VaultError> {
        self.observer
            .on_operation_started(EngineOperation::RotateKek, self.kek_alias.as_str());

        match self.rotate_kek_inner(token).await {
            Ok(version) => {
                self.observer.on_key_operation(
                    KeyOperationKind::Rotate,
                    self.kek_alias.as_str(),
                    version.value(),
                );
                self.metrics.record_key_operation("rotate");
                info!(
                    alias = self.kek_alias.as_str(),
                    version = version.value(),
                    "KEK rotated"
                );
                Ok(version)
            }
            Err(e) => {
                self.metrics.record_error(e.category());
                self.observer
                    .on_error(EngineOperation::RotateKek, e.category());
                Err(e)
            }
        }
    }

    async fn rotate_kek_inner(&self, token: &CancellationToken) -> Result<KeyVersion, VaultError> {
        token.check("rotate_kek")?;
        let current = self
            .registry
            .find_active(&self.kek_alias)
            .await?
            .ok_or_else(|| {
                VaultError::registry_failure(format!(
                    "alias '{}' has no active KEK; bootstrap first",
                    self.kek_alias
                ))
            })?;

        token.check("kek create")?;
        let new_external_id = self.kms.create_key(&self.kek_alias).await?;

        let new_version = current.version().next();
        token.check("rotation commit")?;
        self.registry
            .rotate_to(&self.kek_alias, new_version, &new_external_id)
            .await?;
        Ok(new_version)
    }

    /// Computes the keyed equality hash of a value under the engine's
    /// pepper, for building datastore lookups against `F_Hash` companions.
    pub fn compute_basic_hash(&self, value: &FieldValue) -> Result<String, VaultError> {
        let canonical_bytes = Zeroizing::new(canonical::serialize(value)?);
        Ok(keyed_hash::hash_basic(&canonical_bytes, &self.pepper))
    }

    /// Verifies a value against a `F_HashSecure` companion.
    pub fn verify_secure_hash(
        &self,
        value: &FieldValue,
        encoded: &str,
    ) -> Result<bool, VaultError> {
        let canonical_bytes = Zeroizing::new(canonical::serialize(value)?);
        password_hash::verify_secure(&canonical_bytes, &self.pepper, encoded)
    }

    fn generate_dek(&self) -> Result<Dek, VaultError> {
        let mut bytes = [0u8; DEK_LENGTH];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| VaultError::io_error("failed to generate DEK"))?;
        let dek = Dek::new(bytes);
        bytes.zeroize();
        Ok(dek)
    }
}

/// Pepper state machine: `Unknown → Present` via load or create.
async fn resolve_pepper(
    store: &dyn SecretStore,
    pepper_alias: &str,
    rng: &SystemRandom,
) -> Result<Pepper, VaultError> {
    if store.pepper_exists(pepper_alias).await? {
        let stored = Zeroizing::new(store.get_pepper(pepper_alias).await?);
        return Pepper::from_bytes(&stored);
    }

    let mut fresh = Zeroizing::new([0u8; 32]);
    rng.fill(&mut fresh[..])
        .map_err(|_| VaultError::io_error("failed to generate pepper"))?;

    match store.store_pepper(pepper_alias, &fresh[..]).await {
        Ok(()) => {
            info!(alias = pepper_alias, "created service pepper");
            Pepper::from_bytes(&fresh[..])
        }
        Err(store_error) => {
            // Check-then-create lost a race: adopt the winner's pepper.
            // Anything else is a real store failure and propagates.
            if store.pepper_exists(pepper_alias).await? {
                debug!(alias = pepper_alias, "pepper creation raced; adopting stored value");
                let stored = Zeroizing::new(store.get_pepper(pepper_alias).await?);
                Pepper::from_bytes(&stored)
            } else {
                Err(store_error)
            }
        }
    }
}

/// KEK state machine bootstrap: `Empty → Active(v=1)`.
async fn bootstrap_kek(
    kms: &dyn KmsAdapter,
    registry: &dyn KekRepository,
    alias: &KekAlias,
    observer: &dyn EngineObserver,
) -> Result<(), VaultError> {
    match kms.get_key_id(alias).await? {
        None => {
            let external_id = kms.create_key(alias).await?;
            match registry
                .record_new(alias, KeyVersion::INITIAL, &external_id)
                .await
            {
                Ok(()) => {
                    observer.on_key_operation(
                        KeyOperationKind::Create,
                        alias.as_str(),
                        KeyVersion::INITIAL.value(),
                    );
                    info!(alias = alias.as_str(), "created initial KEK");
                    Ok(())
                }
                // A concurrent bootstrap recorded version 1 first; its key wins
                Err(VaultError::VersionConflict { .. }) => Ok(()),
                Err(e) => Err(e),
            }
        }
        Some(external_id) => {
            if registry.list_versions(alias).await?.is_empty() {
                match registry
                    .record_new(alias, KeyVersion::INITIAL, &external_id)
                    .await
                {
                    Ok(()) => {
                        info!(
                            alias = alias.as_str(),
                            "adopted existing KMS key as version 1"
                        );
                        Ok(())
                    }
                    Err(VaultError::VersionConflict { .. }) => Ok(()),
                    Err(e) => Err(e),
                }
            } else {
                // Both sides exist; nothing to reconcile
                Ok(())
            }
        }
    }
}
