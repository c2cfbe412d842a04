// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Canonical Field Values
//!
//! This module provides the closed vocabulary of primitive values the engine
//! can canonicalize, and the matching type descriptors the generated record
//! tables carry. Anything outside this vocabulary fails with
//! `UnsupportedType` at the serializer boundary.
//!
//! ## Supported Types
//!
//! | Type        | Canonical encoding                              |
//! |-------------|-------------------------------------------------|
//! | `String`    | `[u32 LE length][UTF-8 bytes]`                  |
//! | `Bytes`     | `[u32 LE length][raw bytes]`                    |
//! | `Int8..64`  | sign-extended to 8 bytes, little-endian         |
//! | `UInt8..64` | zero-extended to 8 bytes, little-endian         |
//! | `Bool`      | single byte `0x00` / `0x01`                     |
//! | `Float32/64`| IEEE-754 little-endian, 4 or 8 bytes            |
//! | `Timestamp` | i64 little-endian nanoseconds since Unix epoch  |
//! | `Record`    | not serialized; dispatched recursively          |
//!
//! The timestamp zero value (exactly zero nanoseconds) is treated as unset:
//! `encrypt` skips it as a no-op, hash operations hash the eight zero bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{PlainRecord, RecordDescriptor};

/// Type descriptor for one record field, carried by the record's transform
/// table so the dispatcher can deserialize companions without reflection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Bytes,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Bool,
    Float32,
    Float64,
    Timestamp,
    /// A field whose type is itself an annotated record
    Record(RecordDescriptor),
}

impl FieldType {
    /// Checks whether a value is of this type. For `Record` the check is
    /// shallow; the dispatcher validates nested shapes recursively.
    pub fn matches(&self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (FieldType::String, FieldValue::String(_))
                | (FieldType::Bytes, FieldValue::Bytes(_))
                | (FieldType::Int8, FieldValue::Int8(_))
                | (FieldType::Int16, FieldValue::Int16(_))
                | (FieldType::Int32, FieldValue::Int32(_))
                | (FieldType::Int64, FieldValue::Int64(_))
                | (FieldType::UInt8, FieldValue::UInt8(_))
                | (FieldType::UInt16, FieldValue::UInt16(_))
                | (FieldType::UInt32, FieldValue::UInt32(_))
                | (FieldType::UInt64, FieldValue::UInt64(_))
                | (FieldType::Bool, FieldValue::Bool(_))
                | (FieldType::Float32, FieldValue::Float32(_))
                | (FieldType::Float64, FieldValue::Float64(_))
                | (FieldType::Timestamp, FieldValue::Timestamp(_))
                | (FieldType::Record(_), FieldValue::Record(_))
        )
    }

    /// The empty value of this type, used for fields whose companions are
    /// one-way (hash-only) and therefore cannot be reversed on decrypt.
    pub fn empty_value(&self) -> FieldValue {
        match self {
            FieldType::String => FieldValue::String(String::new()),
            FieldType::Bytes => FieldValue::Bytes(Vec::new()),
            FieldType::Int8 => FieldValue::Int8(0),
            FieldType::Int16 => FieldValue::Int16(0),
            FieldType::Int32 => FieldValue::Int32(0),
            FieldType::Int64 => FieldValue::Int64(0),
            FieldType::UInt8 => FieldValue::UInt8(0),
            FieldType::UInt16 => FieldValue::UInt16(0),
            FieldType::UInt32 => FieldValue::UInt32(0),
            FieldType::UInt64 => FieldValue::UInt64(0),
            FieldType::Bool => FieldValue::Bool(false),
            FieldType::Float32 => FieldValue::Float32(0.0),
            FieldType::Float64 => FieldValue::Float64(0.0),
            FieldType::Timestamp => FieldValue::zero_timestamp(),
            FieldType::Record(descriptor) => {
                let mut record = PlainRecord::new();
                for spec in descriptor.fields() {
                    record = record.with_field(spec.name(), spec.field_type().empty_value());
                }
                FieldValue::Record(record)
            }
        }
    }

    /// Human-readable type name for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Bytes => "bytes",
            FieldType::Int8 => "int8",
            FieldType::Int16 => "int16",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::UInt8 => "uint8",
            FieldType::UInt16 => "uint16",
            FieldType::UInt32 => "uint32",
            FieldType::UInt64 => "uint64",
            FieldType::Bool => "bool",
            FieldType::Float32 => "float32",
            FieldType::Float64 => "float64",
            FieldType::Timestamp => "timestamp",
            FieldType::Record(_) => "record",
        }
    }
}

/// A plaintext field value drawn from the canonical vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    String(String),
    Bytes(Vec<u8>),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Bool(bool),
    Float32(f32),
    Float64(f64),
    Timestamp(DateTime<Utc>),
    Record(PlainRecord),
}

impl FieldValue {
    /// The unset timestamp (exactly zero nanoseconds since the epoch).
    pub fn zero_timestamp() -> Self {
        FieldValue::Timestamp(DateTime::from_timestamp_nanos(0))
    }

    /// True for a timestamp whose value is exactly zero nanoseconds.
    /// Such a timestamp is skipped by `encrypt` and hashed as zero bytes.
    pub fn is_zero_timestamp(&self) -> bool {
        matches!(
            self,
            FieldValue::Timestamp(ts) if ts.timestamp_nanos_opt() == Some(0)
        )
    }

    /// Human-readable type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::String(_) => "string",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Int8(_) => "int8",
            FieldValue::Int16(_) => "int16",
            FieldValue::Int32(_) => "int32",
            FieldValue::Int64(_) => "int64",
            FieldValue::UInt8(_) => "uint8",
            FieldValue::UInt16(_) => "uint16",
            FieldValue::UInt32(_) => "uint32",
            FieldValue::UInt64(_) => "uint64",
            FieldValue::Bool(_) => "bool",
            FieldValue::Float32(_) => "float32",
            FieldValue::Float64(_) => "float64",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::Record(_) => "record",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_matches() {
        assert!(FieldType::String.matches(&FieldValue::String("a".into())));
        assert!(FieldType::Int32.matches(&FieldValue::Int32(1)));
        assert!(!FieldType::Int32.matches(&FieldValue::Int64(1)));
        assert!(!FieldType::Bool.matches(&FieldValue::UInt8(1)));
    }

    #[test]
    fn test_zero_timestamp_detection() {
        assert!(FieldValue::zero_timestamp().is_zero_timestamp());
        assert!(!FieldValue::Timestamp(Utc::now()).is_zero_timestamp());
        assert!(!FieldValue::Int64(0).is_zero_timestamp());
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(
            FieldType::String.empty_value(),
            FieldValue::String(String::new())
        );
        assert_eq!(FieldType::Bool.empty_value(), FieldValue::Bool(false));
        assert!(FieldType::Timestamp.empty_value().is_zero_timestamp());
    }
}
