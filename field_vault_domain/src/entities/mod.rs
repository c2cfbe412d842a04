// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Entities for the field vault domain.

pub mod kek_entry;
pub mod record;

pub use kek_entry::KekEntry;
pub use record::{
    is_reserved_field, EncryptedRecord, FieldSpec, PlainField, PlainRecord, RecordDescriptor,
    RESERVED_FIELD_NAMES,
};
