// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics Service
//!
//! Prometheus metrics for the engine: record operations, per-transform
//! counters, key-hierarchy operations, error counts by category, and
//! operation latency. The engine holds a single `Arc<MetricsService>`;
//! there is no process-wide metrics state.
//!
//! Metrics carry identifiers only (operation names, error categories),
//! never field names or values.

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use field_vault_domain::VaultError;

const NAMESPACE: &str = "field_vault";

/// Prometheus metrics for engine operations.
pub struct MetricsService {
    registry: Registry,
    records_encrypted_total: IntCounter,
    records_decrypted_total: IntCounter,
    field_transforms_total: IntCounterVec,
    key_operations_total: IntCounterVec,
    errors_total: IntCounterVec,
    operation_duration_seconds: Histogram,
}

impl MetricsService {
    pub fn new() -> Result<Self, VaultError> {
        let registry = Registry::new();

        let records_encrypted_total = IntCounter::with_opts(
            Opts::new("records_encrypted_total", "Total records encrypted").namespace(NAMESPACE),
        )
        .map_err(|e| {
            VaultError::invalid_config(format!("failed to create records_encrypted_total: {}", e))
        })?;

        let records_decrypted_total = IntCounter::with_opts(
            Opts::new("records_decrypted_total", "Total records decrypted").namespace(NAMESPACE),
        )
        .map_err(|e| {
            VaultError::invalid_config(format!("failed to create records_decrypted_total: {}", e))
        })?;

        let field_transforms_total = IntCounterVec::new(
            Opts::new("field_transforms_total", "Total field transforms applied")
                .namespace(NAMESPACE),
            &["transform"],
        )
        .map_err(|e| {
            VaultError::invalid_config(format!("failed to create field_transforms_total: {}", e))
        })?;

        let key_operations_total = IntCounterVec::new(
            Opts::new("key_operations_total", "Total key hierarchy operations")
                .namespace(NAMESPACE),
            &["operation"],
        )
        .map_err(|e| {
            VaultError::invalid_config(format!("failed to create key_operations_total: {}", e))
        })?;

        let errors_total = IntCounterVec::new(
            Opts::new("errors_total", "Total engine errors by category").namespace(NAMESPACE),
            &["category"],
        )
        .map_err(|e| VaultError::invalid_config(format!("failed to create errors_total: {}", e)))?;

        let operation_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "operation_duration_seconds",
                "Engine operation latency in seconds",
            )
            .namespace(NAMESPACE),
        )
        .map_err(|e| {
            VaultError::invalid_config(format!(
                "failed to create operation_duration_seconds: {}",
                e
            ))
        })?;

        registry
            .register(Box::new(records_encrypted_total.clone()))
            .map_err(|e| {
                VaultError::invalid_config(format!("failed to register records_encrypted_total: {}", e))
            })?;
        registry
            .register(Box::new(records_decrypted_total.clone()))
            .map_err(|e| {
                VaultError::invalid_config(format!("failed to register records_decrypted_total: {}", e))
            })?;
        registry
            .register(Box::new(field_transforms_total.clone()))
            .map_err(|e| {
                VaultError::invalid_config(format!("failed to register field_transforms_total: {}", e))
            })?;
        registry
            .register(Box::new(key_operations_total.clone()))
            .map_err(|e| {
                VaultError::invalid_config(format!("failed to register key_operations_total: {}", e))
            })?;
        registry
            .register(Box::new(errors_total.clone()))
            .map_err(|e| {
                VaultError::invalid_config(format!("failed to register errors_total: {}", e))
            })?;
        registry
            .register(Box::new(operation_duration_seconds.clone()))
            .map_err(|e| {
                VaultError::invalid_config(format!(
                    "failed to register operation_duration_seconds: {}",
                    e
                ))
            })?;

        Ok(Self {
            registry,
            records_encrypted_total,
            records_decrypted_total,
            field_transforms_total,
            key_operations_total,
            errors_total,
            operation_duration_seconds,
        })
    }

    pub fn record_encrypt(&self, duration_seconds: f64) {
        self.records_encrypted_total.inc();
        self.operation_duration_seconds.observe(duration_seconds);
    }

    pub fn record_decrypt(&self, duration_seconds: f64) {
        self.records_decrypted_total.inc();
        self.operation_duration_seconds.observe(duration_seconds);
    }

    pub fn record_field_transform(&self, transform: &str) {
        self.field_transforms_total
            .with_label_values(&[transform])
            .inc();
    }

    pub fn record_key_operation(&self, operation: &str) {
        self.key_operations_total
            .with_label_values(&[operation])
            .inc();
    }

    pub fn record_error(&self, category: &'static str) {
        self.errors_total.with_label_values(&[category]).inc();
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn export(&self) -> Result<String, VaultError> {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .map_err(|e| VaultError::invalid_config(format!("failed to encode metrics: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increment() {
        let metrics = MetricsService::new().unwrap();
        metrics.record_encrypt(0.001);
        metrics.record_decrypt(0.002);
        metrics.record_field_transform("encrypt");
        metrics.record_field_transform("hash_basic");
        metrics.record_key_operation("wrap");
        metrics.record_error("kms");

        let exported = metrics.export().unwrap();
        assert!(exported.contains("field_vault_records_encrypted_total 1"));
        assert!(exported.contains("field_vault_records_decrypted_total 1"));
        assert!(exported.contains("transform=\"encrypt\""));
        assert!(exported.contains("category=\"kms\""));
    }

    #[test]
    fn test_independent_registries() {
        // Two services never share counters
        let a = MetricsService::new().unwrap();
        let b = MetricsService::new().unwrap();
        a.record_encrypt(0.001);
        assert!(b.export().unwrap().contains("field_vault_records_encrypted_total 0"));
    }
}
