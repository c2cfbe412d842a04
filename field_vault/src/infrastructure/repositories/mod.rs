// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Persistence implementations for the domain's repository ports.

pub mod sqlite_kek_repository;

pub use sqlite_kek_repository::SqliteKekRepository;
