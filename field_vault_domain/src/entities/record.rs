// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Record Model
//!
//! This module provides the static record model the engine operates on:
//!
//! - `RecordDescriptor`: the per-record transform table (ordered field
//!   specs with types and annotation sets). Descriptors are emitted by an
//!   external generator from the consumer's schema; the engine never
//!   discovers companions by name suffix at runtime.
//! - `PlainRecord`: ordered plaintext field values matching a descriptor.
//! - `EncryptedRecord`: the parallel encrypted record, explicit maps from
//!   source field name to each companion, plus the three envelope fields
//!   (`DEKEncrypted`, `KeyVersion`, `Metadata`).
//!
//! The conventional companion suffixes (`Encrypted`, `Hash`, `HashSecure`)
//! exist only in the consumer's serialized schema for human readability;
//! inside the engine the companion maps are explicit.
//!
//! ## Reserved Names
//!
//! Source fields named `DEK`, `DEKEncrypted`, or `KeyVersion` collide with
//! the envelope and are skipped by the dispatcher.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value_objects::{AnnotationSet, FieldType, FieldValue, KeyVersion};

/// Field names reserved for the envelope; the dispatcher skips them.
pub const RESERVED_FIELD_NAMES: [&str; 3] = ["DEK", "DEKEncrypted", "KeyVersion"];

/// Checks whether a field name collides with the envelope.
pub fn is_reserved_field(name: &str) -> bool {
    RESERVED_FIELD_NAMES.contains(&name)
}

/// One entry of a record's transform table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    name: String,
    field_type: FieldType,
    annotations: AnnotationSet,
}

impl FieldSpec {
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        annotations: AnnotationSet,
    ) -> Self {
        Self {
            name: name.into(),
            field_type,
            annotations,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn annotations(&self) -> AnnotationSet {
        self.annotations
    }
}

/// The static transform table for one record type.
///
/// Ordered list of field specs plus an opaque schema identifier that the
/// orchestrator stamps into the `Metadata` envelope field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordDescriptor {
    schema_id: String,
    fields: Vec<FieldSpec>,
}

impl RecordDescriptor {
    pub fn new(schema_id: impl Into<String>) -> Self {
        Self {
            schema_id: schema_id.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field spec, builder-style.
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        annotations: AnnotationSet,
    ) -> Self {
        self.fields.push(FieldSpec::new(name, field_type, annotations));
        self
    }

    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn find(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name() == name)
    }
}

/// One plaintext field of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlainField {
    pub name: String,
    pub value: FieldValue,
}

/// An ordered plaintext record matching a `RecordDescriptor`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlainRecord {
    fields: Vec<PlainField>,
}

impl PlainRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field value, builder-style.
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.push(PlainField {
            name: name.into(),
            value,
        });
        self
    }

    pub fn fields(&self) -> &[PlainField] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The parallel encrypted record produced by `encrypt_record`.
///
/// Companion values are keyed by the *source* field name; the consumer maps
/// them onto its own `F_Encrypted` / `F_Hash` / `F_HashSecure` schema. The
/// engine defines only the per-companion byte formats, not an overall record
/// container.
///
/// Nested encrypted records (from embedded record fields) carry no envelope
/// of their own: the whole tree shares one DEK and one KEK version, so
/// `key_version` is `None` and `dek_encrypted` is empty below the root.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EncryptedRecord {
    encrypted: BTreeMap<String, Vec<u8>>,
    hashes: BTreeMap<String, String>,
    secure_hashes: BTreeMap<String, String>,
    nested: BTreeMap<String, EncryptedRecord>,
    dek_encrypted: Vec<u8>,
    key_version: Option<KeyVersion>,
    metadata: String,
}

impl EncryptedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_encrypted(&mut self, field: impl Into<String>, ciphertext: Vec<u8>) {
        self.encrypted.insert(field.into(), ciphertext);
    }

    pub fn insert_hash(&mut self, field: impl Into<String>, hash: String) {
        self.hashes.insert(field.into(), hash);
    }

    pub fn insert_secure_hash(&mut self, field: impl Into<String>, hash: String) {
        self.secure_hashes.insert(field.into(), hash);
    }

    pub fn insert_nested(&mut self, field: impl Into<String>, record: EncryptedRecord) {
        self.nested.insert(field.into(), record);
    }

    pub fn encrypted(&self, field: &str) -> Option<&[u8]> {
        self.encrypted.get(field).map(Vec::as_slice)
    }

    /// Mutable companion access, used by consumers that re-wrap ciphertexts
    /// and by tamper-detection tests.
    pub fn encrypted_mut(&mut self, field: &str) -> Option<&mut Vec<u8>> {
        self.encrypted.get_mut(field)
    }

    pub fn hash(&self, field: &str) -> Option<&str> {
        self.hashes.get(field).map(String::as_str)
    }

    pub fn secure_hash(&self, field: &str) -> Option<&str> {
        self.secure_hashes.get(field).map(String::as_str)
    }

    pub fn nested(&self, field: &str) -> Option<&EncryptedRecord> {
        self.nested.get(field)
    }

    /// Stamps the envelope: the wrapped DEK and the KEK version in effect
    /// at wrap time.
    pub fn set_envelope(&mut self, dek_encrypted: Vec<u8>, key_version: KeyVersion) {
        self.dek_encrypted = dek_encrypted;
        self.key_version = Some(key_version);
    }

    pub fn dek_encrypted(&self) -> &[u8] {
        &self.dek_encrypted
    }

    pub fn key_version(&self) -> Option<KeyVersion> {
        self.key_version
    }

    pub fn set_metadata(&mut self, metadata: impl Into<String>) {
        self.metadata = metadata.into();
    }

    pub fn metadata(&self) -> &str {
        &self.metadata
    }

    /// Number of companion values across all maps (excluding nested trees)
    pub fn companion_count(&self) -> usize {
        self.encrypted.len() + self.hashes.len() + self.secure_hashes.len()
    }

    /// True when the record carries no companions and no nested records
    pub fn is_empty(&self) -> bool {
        self.companion_count() == 0 && self.nested.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::Transform;

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved_field("DEK"));
        assert!(is_reserved_field("DEKEncrypted"));
        assert!(is_reserved_field("KeyVersion"));
        assert!(!is_reserved_field("Email"));
        assert!(!is_reserved_field("dek"));
    }

    #[test]
    fn test_descriptor_builder() {
        let descriptor = RecordDescriptor::new("user-v1")
            .with_field("Email", FieldType::String, AnnotationSet::encrypt())
            .with_field(
                "Password",
                FieldType::String,
                AnnotationSet::hash_secure(),
            );
        assert_eq!(descriptor.schema_id(), "user-v1");
        assert_eq!(descriptor.fields().len(), 2);
        assert!(descriptor.find("Email").is_some());
        assert!(descriptor.find("Missing").is_none());
        assert!(descriptor
            .find("Password")
            .unwrap()
            .annotations()
            .contains(Transform::HashSecure));
    }

    #[test]
    fn test_plain_record_lookup() {
        let record = PlainRecord::new()
            .with_field("Email", FieldValue::String("a@b.c".into()))
            .with_field("Age", FieldValue::UInt8(42));
        assert_eq!(
            record.get("Email"),
            Some(&FieldValue::String("a@b.c".into()))
        );
        assert_eq!(record.get("Missing"), None);
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_encrypted_record_companions() {
        let mut record = EncryptedRecord::new();
        record.insert_encrypted("Email", vec![1, 2, 3]);
        record.insert_hash("Email", "ab".repeat(32));
        record.set_envelope(vec![9, 9], KeyVersion::INITIAL);
        record.set_metadata("user-v1");

        assert_eq!(record.encrypted("Email"), Some(&[1u8, 2, 3][..]));
        assert_eq!(record.hash("Email").unwrap().len(), 64);
        assert_eq!(record.key_version(), Some(KeyVersion::INITIAL));
        assert_eq!(record.dek_encrypted(), &[9, 9]);
        assert_eq!(record.metadata(), "user-v1");
        assert_eq!(record.companion_count(), 2);
    }
}
