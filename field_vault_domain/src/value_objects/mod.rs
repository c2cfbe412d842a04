// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Value objects for the field vault domain.
//!
//! Immutable, self-validating values with attribute-based equality:
//! aliases, versions, key material, hash parameters, and the canonical
//! field vocabulary.

pub mod annotation;
pub mod argon_params;
pub mod dek;
pub mod field_value;
pub mod kek_alias;
pub mod key_version;
pub mod pepper;

pub use annotation::{AnnotationSet, Transform};
pub use argon_params::ArgonParams;
pub use dek::{Dek, DEK_LENGTH};
pub use field_value::{FieldType, FieldValue};
pub use kek_alias::KekAlias;
pub use key_version::KeyVersion;
pub use pepper::{Pepper, PEPPER_LENGTH};
