// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain events and the observability capability.

pub mod engine_events;

pub use engine_events::{EngineObserver, EngineOperation, KeyOperationKind, NoopObserver};
