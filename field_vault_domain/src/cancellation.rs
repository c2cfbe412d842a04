// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cancellation Token
//!
//! Lightweight clone-able token for cooperative cancellation with an
//! optional deadline. The engine checks the token before every I/O boundary
//! (KMS calls, secret-store access, registry reads and writes) and returns
//! `Cancelled` without partial persistence when it has tripped.
//!
//! Pure-CPU crypto inside a field transform is not preempted; per-field work
//! is small except for `hash_secure`, which honors the configured Argon
//! parameters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::VaultError;

/// Clone-able cancellation token with an optional deadline.
///
/// The default token never cancels, so call sites that do not care about
/// cancellation pass `&CancellationToken::default()`.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    /// Shared cancellation flag
    cancelled: Arc<AtomicBool>,
    /// Absolute deadline, if any
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// Create a token that only cancels when `cancel` is called
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token that also trips once the timeout elapses
    pub fn with_deadline(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Cancel this token and every clone of it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancelled or past the deadline (non-blocking)
    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }

    /// Returns `Cancelled` naming the operation that observed the token,
    /// or `Ok(())` when the token is live.
    pub fn check(&self, operation: &str) -> Result<(), VaultError> {
        if self.is_cancelled() {
            Err(VaultError::cancelled(format!(
                "{} observed cancellation",
                operation
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_live() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check("kms wrap").is_ok());
    }

    #[test]
    fn test_cancel_propagates_to_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
        assert!(matches!(
            clone.check("registry read"),
            Err(VaultError::Cancelled(_))
        ));
    }

    #[test]
    fn test_deadline_trips() {
        let token = CancellationToken::with_deadline(Duration::from_millis(0));
        assert!(token.is_cancelled());

        let live = CancellationToken::with_deadline(Duration::from_secs(3600));
        assert!(!live.is_cancelled());
    }
}
