// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain services and infrastructure ports.
//!
//! The canonical serializer is a sync, CPU-bound domain service. The KMS
//! adapter and secret store are async infrastructure ports: traits the
//! infrastructure layer implements against external systems.

pub mod canonical;
pub mod kms_adapter;
pub mod secret_store;

pub use kms_adapter::KmsAdapter;
pub use secret_store::SecretStore;
