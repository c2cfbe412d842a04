// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Field Transform Dispatcher
//!
//! Walks a record's transform table and routes every annotated field through
//! the cryptographic primitives, assembling the parallel encrypted record.
//!
//! ## Contract Per Field
//!
//! - `encrypt`: serialize → AEAD-encrypt with the record DEK → companion
//!   ciphertext. A zero-valued timestamp is skipped as a no-op.
//! - `hash_basic`: serialize → keyed hash → companion hex string.
//! - `hash_secure`: serialize → memory-hard hash → companion PHC string.
//! - Combined sets run each operation independently against the original
//!   plaintext; no operation reads another's output.
//! - Embedded record fields recurse with the same DEK; their companions
//!   land in a nested encrypted record.
//! - Reserved envelope names (`DEK`, `DEKEncrypted`, `KeyVersion`) are
//!   skipped.
//!
//! Failures are accumulated per field, never short-circuited: every field
//! is attempted and the orchestrator decides what to do with the aggregate.
//! The dispatcher never mutates the caller's record; plaintext staging
//! buffers are zeroized as they go out of scope.

use zeroize::Zeroizing;

use field_vault_domain::services::canonical;
use field_vault_domain::{
    is_reserved_field, ArgonParams, Dek, EncryptedRecord, FieldType, FieldValue, Pepper,
    PlainRecord, ProcessingErrors, RecordDescriptor, Transform, VaultError,
};

use crate::infrastructure::crypto::{keyed_hash, password_hash, AeadCipher};
use crate::infrastructure::metrics::MetricsService;

/// Everything a dispatch pass needs, borrowed from the enclosing operation.
pub(crate) struct TransformContext<'a> {
    pub dek: &'a Dek,
    pub pepper: &'a Pepper,
    pub argon: &'a ArgonParams,
    pub aead: &'a AeadCipher,
    pub metrics: &'a MetricsService,
}

/// Validates a record against its descriptor: every described field must be
/// present with a matching type, no undeclared fields may appear, and
/// embedded records must validate recursively.
pub(crate) fn validate_shape(
    descriptor: &RecordDescriptor,
    record: &PlainRecord,
) -> Result<(), VaultError> {
    for spec in descriptor.fields() {
        if is_reserved_field(spec.name()) {
            continue;
        }
        let value = record.get(spec.name()).ok_or_else(|| {
            VaultError::invalid_config(format!("record is missing field '{}'", spec.name()))
        })?;
        if !spec.field_type().matches(value) {
            return Err(VaultError::invalid_config(format!(
                "field '{}' expects {} but record holds {}",
                spec.name(),
                spec.field_type().name(),
                value.type_name()
            )));
        }
        if let (FieldType::Record(nested_descriptor), FieldValue::Record(nested_record)) =
            (spec.field_type(), value)
        {
            validate_shape(nested_descriptor, nested_record)
                .map_err(|e| VaultError::invalid_config(format!("{}: {}", spec.name(), e)))?;
        }
    }

    for field in record.fields() {
        if !is_reserved_field(&field.name) && descriptor.find(&field.name).is_none() {
            return Err(VaultError::invalid_config(format!(
                "record holds undeclared field '{}'",
                field.name
            )));
        }
    }
    Ok(())
}

/// Encrypt-path dispatch: fills companion maps from plaintext fields.
///
/// Returns the assembled record (without its envelope) together with the
/// per-field failure aggregate; the caller discards the record when the
/// aggregate is non-empty.
pub(crate) fn encrypt_fields(
    ctx: &TransformContext<'_>,
    descriptor: &RecordDescriptor,
    record: &PlainRecord,
) -> (EncryptedRecord, ProcessingErrors) {
    let mut out = EncryptedRecord::new();
    let mut errors = ProcessingErrors::new();

    for spec in descriptor.fields() {
        if is_reserved_field(spec.name()) {
            continue;
        }
        let Some(value) = record.get(spec.name()) else {
            // Shape validation runs first; a gap here is a caller bug
            errors.record(
                spec.name(),
                VaultError::invalid_config(format!("record is missing field '{}'", spec.name())),
            );
            continue;
        };

        // Embedded records recurse with the same DEK regardless of their
        // own annotation set; the nested fields' annotations drive
        if let (FieldType::Record(nested_descriptor), FieldValue::Record(nested_record)) =
            (spec.field_type(), value)
        {
            let (nested_out, nested_errors) =
                encrypt_fields(ctx, nested_descriptor, nested_record);
            if !nested_out.is_empty() {
                out.insert_nested(spec.name(), nested_out);
            }
            errors.merge_nested(spec.name(), nested_errors);
            continue;
        }

        let annotations = spec.annotations();
        if annotations.is_empty() {
            continue;
        }

        let canonical_bytes = match canonical::serialize(value) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(e) => {
                errors.record(spec.name(), e);
                continue;
            }
        };

        if annotations.contains(Transform::Encrypt) {
            if value.is_zero_timestamp() {
                // Unset timestamp: no companion is emitted
            } else {
                match ctx.aead.encrypt(ctx.dek.as_bytes(), &canonical_bytes) {
                    Ok(ciphertext) => {
                        out.insert_encrypted(spec.name(), ciphertext);
                        ctx.metrics.record_field_transform("encrypt");
                    }
                    Err(e) => errors.record(spec.name(), e),
                }
            }
        }

        if annotations.contains(Transform::HashBasic) {
            out.insert_hash(spec.name(), keyed_hash::hash_basic(&canonical_bytes, ctx.pepper));
            ctx.metrics.record_field_transform("hash_basic");
        }

        if annotations.contains(Transform::HashSecure) {
            match password_hash::hash_secure(&canonical_bytes, ctx.pepper, ctx.argon) {
                Ok(hash) => {
                    out.insert_secure_hash(spec.name(), hash);
                    ctx.metrics.record_field_transform("hash_secure");
                }
                Err(e) => errors.record(spec.name(), e),
            }
        }
    }

    (out, errors)
}

/// Decrypt-path dispatch: rebuilds plaintext fields from `encrypt`
/// companions.
///
/// Hash companions are one-way and are not reversed; their source fields
/// come back as the type's empty value unless `encrypt` was also present.
pub(crate) fn decrypt_fields(
    ctx: &TransformContext<'_>,
    descriptor: &RecordDescriptor,
    encrypted: &EncryptedRecord,
) -> (PlainRecord, ProcessingErrors) {
    let mut record = PlainRecord::new();
    let mut errors = ProcessingErrors::new();

    for spec in descriptor.fields() {
        if is_reserved_field(spec.name()) {
            continue;
        }

        if let FieldType::Record(nested_descriptor) = spec.field_type() {
            let nested_value = match encrypted.nested(spec.name()) {
                Some(nested_encrypted) => {
                    let (nested_record, nested_errors) =
                        decrypt_fields(ctx, nested_descriptor, nested_encrypted);
                    errors.merge_nested(spec.name(), nested_errors);
                    FieldValue::Record(nested_record)
                }
                None => spec.field_type().empty_value(),
            };
            record = record.with_field(spec.name(), nested_value);
            continue;
        }

        let annotations = spec.annotations();
        if !annotations.contains(Transform::Encrypt) {
            record = record.with_field(spec.name(), spec.field_type().empty_value());
            continue;
        }

        match encrypted.encrypted(spec.name()) {
            Some(ciphertext) => {
                match decrypt_value(ctx, spec.field_type(), ciphertext) {
                    Ok(value) => record = record.with_field(spec.name(), value),
                    Err(e) => {
                        errors.record(spec.name(), e);
                        record = record.with_field(spec.name(), spec.field_type().empty_value());
                    }
                }
            }
            // The zero timestamp is the one value encrypt legitimately skips
            None if *spec.field_type() == FieldType::Timestamp => {
                record = record.with_field(spec.name(), FieldValue::zero_timestamp());
            }
            None => {
                errors.record(
                    spec.name(),
                    VaultError::invalid_config(format!(
                        "encrypted record is missing companion for field '{}'",
                        spec.name()
                    )),
                );
                record = record.with_field(spec.name(), spec.field_type().empty_value());
            }
        }
    }

    (record, errors)
}

fn decrypt_value(
    ctx: &TransformContext<'_>,
    field_type: &FieldType,
    ciphertext: &[u8],
) -> Result<FieldValue, VaultError> {
    let canonical_bytes = Zeroizing::new(ctx.aead.decrypt(ctx.dek.as_bytes(), ciphertext)?);
    canonical::deserialize(&canonical_bytes, field_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use field_vault_domain::AnnotationSet;

    fn context_parts() -> (Dek, Pepper, ArgonParams, AeadCipher, MetricsService) {
        (
            Dek::new([0x51; 32]),
            Pepper::from_bytes(&[0x61; 32]).unwrap(),
            ArgonParams::default()
                .with_memory_kib(8192)
                .with_iterations(1)
                .with_parallelism(1),
            AeadCipher::new(),
            MetricsService::new().unwrap(),
        )
    }

    macro_rules! ctx {
        ($parts:expr) => {
            TransformContext {
                dek: &$parts.0,
                pepper: &$parts.1,
                argon: &$parts.2,
                aead: &$parts.3,
                metrics: &$parts.4,
            }
        };
    }

    fn user_descriptor() -> RecordDescriptor {
        RecordDescriptor::new("user-v1")
            .with_field(
                "Email",
                FieldType::String,
                AnnotationSet::encrypt().and(Transform::HashBasic),
            )
            .with_field("Password", FieldType::String, AnnotationSet::hash_secure())
            .with_field("Age", FieldType::UInt8, AnnotationSet::none())
    }

    fn user_record() -> PlainRecord {
        PlainRecord::new()
            .with_field("Email", FieldValue::String("user@example.com".into()))
            .with_field("Password", FieldValue::String("hunter2".into()))
            .with_field("Age", FieldValue::UInt8(42))
    }

    #[test]
    fn test_shape_validation() {
        assert!(validate_shape(&user_descriptor(), &user_record()).is_ok());

        let missing = PlainRecord::new().with_field("Email", FieldValue::String("x".into()));
        assert!(validate_shape(&user_descriptor(), &missing).is_err());

        let mismatched = user_record().with_field("Extra", FieldValue::Bool(true));
        assert!(validate_shape(&user_descriptor(), &mismatched).is_err());

        let wrong_type = PlainRecord::new()
            .with_field("Email", FieldValue::Int32(1))
            .with_field("Password", FieldValue::String("x".into()))
            .with_field("Age", FieldValue::UInt8(1));
        assert!(validate_shape(&user_descriptor(), &wrong_type).is_err());
    }

    #[test]
    fn test_encrypt_dispatch_fills_companions() {
        let parts = context_parts();
        let (out, errors) = encrypt_fields(&ctx!(parts), &user_descriptor(), &user_record());
        assert!(errors.is_empty());

        assert!(out.encrypted("Email").unwrap().len() > 28);
        assert_eq!(out.hash("Email").unwrap().len(), 64);
        assert!(out.secure_hash("Password").unwrap().starts_with("$argon2id$"));
        // Unannotated field gets no companions
        assert!(out.encrypted("Age").is_none());
        assert!(out.hash("Age").is_none());
    }

    #[test]
    fn test_combined_set_reads_original_plaintext() {
        let parts = context_parts();
        let (out, _) = encrypt_fields(&ctx!(parts), &user_descriptor(), &user_record());

        // The hash is over the canonical plaintext, not the ciphertext
        let canonical =
            canonical::serialize(&FieldValue::String("user@example.com".into())).unwrap();
        assert_eq!(
            out.hash("Email").unwrap(),
            keyed_hash::hash_basic(&canonical, &parts.1)
        );
    }

    #[test]
    fn test_round_trip_through_decrypt_dispatch() {
        let parts = context_parts();
        let context = ctx!(parts);
        let (out, errors) = encrypt_fields(&context, &user_descriptor(), &user_record());
        assert!(errors.is_empty());

        let (restored, errors) = decrypt_fields(&context, &user_descriptor(), &out);
        assert!(errors.is_empty());
        assert_eq!(
            restored.get("Email"),
            Some(&FieldValue::String("user@example.com".into()))
        );
        // Hash-only and unannotated fields come back empty
        assert_eq!(restored.get("Password"), Some(&FieldValue::String(String::new())));
        assert_eq!(restored.get("Age"), Some(&FieldValue::UInt8(0)));
    }

    #[test]
    fn test_zero_timestamp_skipped_for_encrypt_hashed_for_hash() {
        let parts = context_parts();
        let context = ctx!(parts);
        let descriptor = RecordDescriptor::new("event-v1").with_field(
            "DeletedAt",
            FieldType::Timestamp,
            AnnotationSet::encrypt().and(Transform::HashBasic),
        );
        let record = PlainRecord::new().with_field("DeletedAt", FieldValue::zero_timestamp());

        let (out, errors) = encrypt_fields(&context, &descriptor, &record);
        assert!(errors.is_empty());
        assert!(out.encrypted("DeletedAt").is_none());
        // Hash of the eight zero bytes
        assert_eq!(
            out.hash("DeletedAt").unwrap(),
            keyed_hash::hash_basic(&[0u8; 8], &parts.1)
        );

        // Decrypt restores the zero timestamp from the absent companion
        let (restored, errors) = decrypt_fields(&context, &descriptor, &out);
        assert!(errors.is_empty());
        assert!(restored.get("DeletedAt").unwrap().is_zero_timestamp());
    }

    #[test]
    fn test_nonzero_timestamp_round_trip() {
        let parts = context_parts();
        let context = ctx!(parts);
        let descriptor = RecordDescriptor::new("event-v1").with_field(
            "CreatedAt",
            FieldType::Timestamp,
            AnnotationSet::encrypt(),
        );
        let ts = Utc.timestamp_opt(1_700_000_000, 123).unwrap();
        let record = PlainRecord::new().with_field("CreatedAt", FieldValue::Timestamp(ts));

        let (out, _) = encrypt_fields(&context, &descriptor, &record);
        let (restored, errors) = decrypt_fields(&context, &descriptor, &out);
        assert!(errors.is_empty());
        assert_eq!(restored.get("CreatedAt"), Some(&FieldValue::Timestamp(ts)));
    }

    #[test]
    fn test_reserved_fields_skipped() {
        let parts = context_parts();
        let descriptor = RecordDescriptor::new("odd-v1")
            .with_field("DEK", FieldType::Bytes, AnnotationSet::encrypt())
            .with_field("KeyVersion", FieldType::Int64, AnnotationSet::hash_basic())
            .with_field("Name", FieldType::String, AnnotationSet::encrypt());
        let record = PlainRecord::new()
            .with_field("DEK", FieldValue::Bytes(vec![1]))
            .with_field("KeyVersion", FieldValue::Int64(9))
            .with_field("Name", FieldValue::String("n".into()));

        let (out, errors) = encrypt_fields(&ctx!(parts), &descriptor, &record);
        assert!(errors.is_empty());
        assert!(out.encrypted("DEK").is_none());
        assert!(out.hash("KeyVersion").is_none());
        assert!(out.encrypted("Name").is_some());
    }

    #[test]
    fn test_errors_accumulate_without_short_circuit() {
        let parts = context_parts();
        let descriptor = RecordDescriptor::new("bad-v1")
            .with_field("First", FieldType::Timestamp, AnnotationSet::encrypt())
            .with_field("Second", FieldType::Timestamp, AnnotationSet::encrypt())
            .with_field("Good", FieldType::String, AnnotationSet::encrypt());
        // Timestamps past the year 2262 overflow the nanosecond encoding
        let far_future = Utc.timestamp_opt(300_000_000_000, 0).unwrap();
        let record = PlainRecord::new()
            .with_field("First", FieldValue::Timestamp(far_future))
            .with_field("Second", FieldValue::Timestamp(far_future + Duration::hours(1)))
            .with_field("Good", FieldValue::String("still processed".into()));

        let (out, errors) = encrypt_fields(&ctx!(parts), &descriptor, &record);
        assert_eq!(errors.len(), 2);
        assert!(errors.get("First").is_some());
        assert!(errors.get("Second").is_some());
        // The healthy field was still attempted
        assert!(out.encrypted("Good").is_some());
    }

    #[test]
    fn test_nested_record_recursion() {
        let parts = context_parts();
        let context = ctx!(parts);
        let address = RecordDescriptor::new("address-v1")
            .with_field("Street", FieldType::String, AnnotationSet::encrypt())
            .with_field("City", FieldType::String, AnnotationSet::hash_basic());
        let descriptor = RecordDescriptor::new("person-v1")
            .with_field("Name", FieldType::String, AnnotationSet::encrypt())
            .with_field(
                "Address",
                FieldType::Record(address.clone()),
                AnnotationSet::none(),
            );
        let record = PlainRecord::new()
            .with_field("Name", FieldValue::String("Ada".into()))
            .with_field(
                "Address",
                FieldValue::Record(
                    PlainRecord::new()
                        .with_field("Street", FieldValue::String("1 Main St".into()))
                        .with_field("City", FieldValue::String("Springfield".into())),
                ),
            );

        assert!(validate_shape(&descriptor, &record).is_ok());
        let (out, errors) = encrypt_fields(&context, &descriptor, &record);
        assert!(errors.is_empty());

        let nested = out.nested("Address").unwrap();
        assert!(nested.encrypted("Street").is_some());
        assert!(nested.hash("City").is_some());
        // Nested records carry no envelope of their own
        assert!(nested.key_version().is_none());
        assert!(nested.dek_encrypted().is_empty());

        let (restored, errors) = decrypt_fields(&context, &descriptor, &out);
        assert!(errors.is_empty());
        let FieldValue::Record(restored_address) = restored.get("Address").unwrap() else {
            panic!("expected nested record");
        };
        assert_eq!(
            restored_address.get("Street"),
            Some(&FieldValue::String("1 Main St".into()))
        );
        // Hash-only nested field is not reversed
        assert_eq!(
            restored_address.get("City"),
            Some(&FieldValue::String(String::new()))
        );
    }

    #[test]
    fn test_doubly_nested_records_survive() {
        let parts = context_parts();
        let context = ctx!(parts);
        let geo = RecordDescriptor::new("geo-v1").with_field(
            "Lat",
            FieldType::Float64,
            AnnotationSet::encrypt(),
        );
        let address = RecordDescriptor::new("address-v1").with_field(
            "Geo",
            FieldType::Record(geo),
            AnnotationSet::none(),
        );
        let descriptor = RecordDescriptor::new("person-v1").with_field(
            "Address",
            FieldType::Record(address),
            AnnotationSet::none(),
        );
        let record = PlainRecord::new().with_field(
            "Address",
            FieldValue::Record(PlainRecord::new().with_field(
                "Geo",
                FieldValue::Record(
                    PlainRecord::new().with_field("Lat", FieldValue::Float64(51.5)),
                ),
            )),
        );

        let (out, errors) = encrypt_fields(&context, &descriptor, &record);
        assert!(errors.is_empty());
        // The middle layer has no companions of its own, only the subtree
        let geo_out = out.nested("Address").unwrap().nested("Geo").unwrap();
        assert!(geo_out.encrypted("Lat").is_some());

        let (restored, errors) = decrypt_fields(&context, &descriptor, &out);
        assert!(errors.is_empty());
        let FieldValue::Record(address_restored) = restored.get("Address").unwrap() else {
            panic!("expected nested record");
        };
        let FieldValue::Record(geo_restored) = address_restored.get("Geo").unwrap() else {
            panic!("expected nested record");
        };
        assert_eq!(geo_restored.get("Lat"), Some(&FieldValue::Float64(51.5)));
    }

    #[test]
    fn test_nested_errors_carry_prefixed_names() {
        let parts = context_parts();
        let inner = RecordDescriptor::new("inner-v1").with_field(
            "When",
            FieldType::Timestamp,
            AnnotationSet::encrypt(),
        );
        let descriptor = RecordDescriptor::new("outer-v1").with_field(
            "Inner",
            FieldType::Record(inner),
            AnnotationSet::none(),
        );
        let far_future = Utc.timestamp_opt(300_000_000_000, 0).unwrap();
        let record = PlainRecord::new().with_field(
            "Inner",
            FieldValue::Record(
                PlainRecord::new().with_field("When", FieldValue::Timestamp(far_future)),
            ),
        );

        let (_, errors) = encrypt_fields(&ctx!(parts), &descriptor, &record);
        assert!(errors.get("Inner.When").is_some());
    }

    #[test]
    fn test_tampered_companion_reported_per_field() {
        let parts = context_parts();
        let context = ctx!(parts);
        let descriptor = RecordDescriptor::new("user-v1").with_field(
            "Email",
            FieldType::String,
            AnnotationSet::encrypt(),
        );
        let record =
            PlainRecord::new().with_field("Email", FieldValue::String("user@example.com".into()));

        let (mut out, _) = encrypt_fields(&context, &descriptor, &record);
        let companion = out.encrypted_mut("Email").unwrap();
        let last = companion.len() - 1;
        companion[last] ^= 0xFF;

        let (_, errors) = decrypt_fields(&context, &descriptor, &out);
        assert!(matches!(
            errors.get("Email"),
            Some(VaultError::AuthenticationFailed(_))
        ));
    }
}
