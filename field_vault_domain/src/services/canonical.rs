// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Canonical Serializer
//!
//! This module provides the canonical, deterministic byte encoding of
//! primitive field values. The encoding is a pure function of the value:
//! repeated serialization of the same value yields identical bytes, which is
//! what makes the keyed equality hash usable for lookups and keeps AEAD
//! inputs stable.
//!
//! ## Encoding Rules
//!
//! - Variable-width values (`String`, `Bytes`) carry a `u32` little-endian
//!   length prefix followed by the payload bytes.
//! - Fixed-width primitives carry **no** length prefix: signed integers are
//!   sign-extended and unsigned integers zero-extended to 8 bytes
//!   little-endian; booleans are one byte; floats are IEEE-754
//!   little-endian at their natural width; timestamps are the signed
//!   64-bit little-endian nanosecond count since the Unix epoch.
//! - Embedded records are not serialized here; the dispatcher recurses into
//!   them instead.
//!
//! Values outside the vocabulary, and canonical bytes that do not decode
//! exactly, fail with `UnsupportedType`.
//!
//! This is a CPU-bound, synchronous domain service; it performs no I/O.

use chrono::DateTime;

use crate::value_objects::{FieldType, FieldValue};
use crate::VaultError;

/// Serializes a field value into its canonical byte encoding.
pub fn serialize(value: &FieldValue) -> Result<Vec<u8>, VaultError> {
    match value {
        FieldValue::String(s) => serialize_length_prefixed(s.as_bytes()),
        FieldValue::Bytes(b) => serialize_length_prefixed(b),
        FieldValue::Int8(v) => Ok((*v as i64).to_le_bytes().to_vec()),
        FieldValue::Int16(v) => Ok((*v as i64).to_le_bytes().to_vec()),
        FieldValue::Int32(v) => Ok((*v as i64).to_le_bytes().to_vec()),
        FieldValue::Int64(v) => Ok(v.to_le_bytes().to_vec()),
        FieldValue::UInt8(v) => Ok((*v as u64).to_le_bytes().to_vec()),
        FieldValue::UInt16(v) => Ok((*v as u64).to_le_bytes().to_vec()),
        FieldValue::UInt32(v) => Ok((*v as u64).to_le_bytes().to_vec()),
        FieldValue::UInt64(v) => Ok(v.to_le_bytes().to_vec()),
        FieldValue::Bool(v) => Ok(vec![u8::from(*v)]),
        FieldValue::Float32(v) => Ok(v.to_le_bytes().to_vec()),
        FieldValue::Float64(v) => Ok(v.to_le_bytes().to_vec()),
        FieldValue::Timestamp(ts) => {
            let nanos = ts.timestamp_nanos_opt().ok_or_else(|| {
                VaultError::unsupported_type(
                    "timestamp outside the representable nanosecond range",
                )
            })?;
            Ok(nanos.to_le_bytes().to_vec())
        }
        FieldValue::Record(_) => Err(VaultError::unsupported_type(
            "embedded records are dispatched recursively, not serialized",
        )),
    }
}

/// Deserializes canonical bytes back into a value of the given type.
///
/// The bytes must decode exactly: trailing bytes, short buffers, and
/// out-of-range narrowing all fail.
pub fn deserialize(bytes: &[u8], field_type: &FieldType) -> Result<FieldValue, VaultError> {
    match field_type {
        FieldType::String => {
            let payload = deserialize_length_prefixed(bytes, "string")?;
            let s = String::from_utf8(payload.to_vec()).map_err(|_| {
                VaultError::unsupported_type("string payload is not valid UTF-8")
            })?;
            Ok(FieldValue::String(s))
        }
        FieldType::Bytes => {
            let payload = deserialize_length_prefixed(bytes, "bytes")?;
            Ok(FieldValue::Bytes(payload.to_vec()))
        }
        FieldType::Int8 => narrow_signed(bytes, "int8", i64::from(i8::MIN), i64::from(i8::MAX))
            .map(|v| FieldValue::Int8(v as i8)),
        FieldType::Int16 => narrow_signed(bytes, "int16", i64::from(i16::MIN), i64::from(i16::MAX))
            .map(|v| FieldValue::Int16(v as i16)),
        FieldType::Int32 => narrow_signed(bytes, "int32", i64::from(i32::MIN), i64::from(i32::MAX))
            .map(|v| FieldValue::Int32(v as i32)),
        FieldType::Int64 => read_i64(bytes, "int64").map(FieldValue::Int64),
        FieldType::UInt8 => narrow_unsigned(bytes, "uint8", u64::from(u8::MAX))
            .map(|v| FieldValue::UInt8(v as u8)),
        FieldType::UInt16 => narrow_unsigned(bytes, "uint16", u64::from(u16::MAX))
            .map(|v| FieldValue::UInt16(v as u16)),
        FieldType::UInt32 => narrow_unsigned(bytes, "uint32", u64::from(u32::MAX))
            .map(|v| FieldValue::UInt32(v as u32)),
        FieldType::UInt64 => read_u64(bytes, "uint64").map(FieldValue::UInt64),
        FieldType::Bool => match bytes {
            [0x00] => Ok(FieldValue::Bool(false)),
            [0x01] => Ok(FieldValue::Bool(true)),
            _ => Err(VaultError::unsupported_type(
                "bool must be exactly one byte, 0x00 or 0x01",
            )),
        },
        FieldType::Float32 => {
            let fixed: [u8; 4] = bytes.try_into().map_err(|_| {
                VaultError::unsupported_type("float32 must be exactly 4 bytes")
            })?;
            Ok(FieldValue::Float32(f32::from_le_bytes(fixed)))
        }
        FieldType::Float64 => {
            let fixed: [u8; 8] = bytes.try_into().map_err(|_| {
                VaultError::unsupported_type("float64 must be exactly 8 bytes")
            })?;
            Ok(FieldValue::Float64(f64::from_le_bytes(fixed)))
        }
        FieldType::Timestamp => {
            let nanos = read_i64(bytes, "timestamp")?;
            Ok(FieldValue::Timestamp(DateTime::from_timestamp_nanos(nanos)))
        }
        FieldType::Record(_) => Err(VaultError::unsupported_type(
            "embedded records are dispatched recursively, not deserialized",
        )),
    }
}

fn serialize_length_prefixed(payload: &[u8]) -> Result<Vec<u8>, VaultError> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        VaultError::unsupported_type("value exceeds the 4 GiB length-prefix limit")
    })?;
    let mut out = Vec::with_capacity(4 + payload.len());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

fn deserialize_length_prefixed<'a>(
    bytes: &'a [u8],
    what: &str,
) -> Result<&'a [u8], VaultError> {
    if bytes.len() < 4 {
        return Err(VaultError::unsupported_type(format!(
            "{} is missing its length prefix",
            what
        )));
    }
    let (prefix, payload) = bytes.split_at(4);
    let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if payload.len() != len {
        return Err(VaultError::unsupported_type(format!(
            "{} length prefix says {} bytes but {} follow",
            what,
            len,
            payload.len()
        )));
    }
    Ok(payload)
}

fn read_i64(bytes: &[u8], what: &str) -> Result<i64, VaultError> {
    let fixed: [u8; 8] = bytes.try_into().map_err(|_| {
        VaultError::unsupported_type(format!("{} must be exactly 8 bytes", what))
    })?;
    Ok(i64::from_le_bytes(fixed))
}

fn read_u64(bytes: &[u8], what: &str) -> Result<u64, VaultError> {
    let fixed: [u8; 8] = bytes.try_into().map_err(|_| {
        VaultError::unsupported_type(format!("{} must be exactly 8 bytes", what))
    })?;
    Ok(u64::from_le_bytes(fixed))
}

fn narrow_signed(bytes: &[u8], what: &str, min: i64, max: i64) -> Result<i64, VaultError> {
    let wide = read_i64(bytes, what)?;
    if wide < min || wide > max {
        return Err(VaultError::unsupported_type(format!(
            "{} value {} out of range",
            what, wide
        )));
    }
    Ok(wide)
}

fn narrow_unsigned(bytes: &[u8], what: &str, max: u64) -> Result<u64, VaultError> {
    let wide = read_u64(bytes, what)?;
    if wide > max {
        return Err(VaultError::unsupported_type(format!(
            "{} value {} out of range",
            what, wide
        )));
    }
    Ok(wide)
}
