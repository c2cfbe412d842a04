// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Memory-Hard Password Hash
//!
//! Argon2id over `[canonical bytes || pepper]` with the engine's configured
//! parameters and a fresh random salt per call. The output is the
//! conventional self-describing PHC string,
//!
//! ```text
//! $argon2id$v=19$m=65536,t=3,p=2$<salt-b64>$<hash-b64>
//! ```
//!
//! with standard unpadded base64 for salt and hash. Because the string
//! records its own parameters, verification re-derives with the parameters
//! *in the string*, so parameter upgrades never invalidate stored hashes.
//!
//! Verification compares in constant time (the argon2 crate's verifier is
//! built on `subtle`). Two hashes of the same input differ, since the salt
//! is fresh each call, but each verifies against the original input and
//! rejects everything else.

use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

use field_vault_domain::{ArgonParams, Pepper, VaultError};

/// Hashes canonical bytes with the pepper, returning a PHC string.
pub fn hash_secure(
    canonical: &[u8],
    pepper: &Pepper,
    params: &ArgonParams,
) -> Result<String, VaultError> {
    params.validate()?;

    let mut salt_bytes = vec![0u8; params.salt_length as usize];
    SystemRandom::new()
        .fill(&mut salt_bytes)
        .map_err(|_| VaultError::io_error("failed to generate salt"))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| VaultError::invalid_config(format!("invalid salt: {}", e)))?;

    let argon2 = argon2_for(params)?;
    let input = peppered_input(canonical, pepper);

    let hash = argon2
        .hash_password(&input, &salt)
        .map_err(|e| VaultError::invalid_config(format!("argon2 hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Verifies canonical bytes against a PHC string produced by [`hash_secure`].
///
/// Returns `Ok(false)` on a well-formed hash that does not match; errors are
/// reserved for malformed input.
pub fn verify_secure(
    canonical: &[u8],
    pepper: &Pepper,
    encoded: &str,
) -> Result<bool, VaultError> {
    let parsed = PasswordHash::new(encoded)
        .map_err(|e| VaultError::invalid_config(format!("malformed hash string: {}", e)))?;

    let input = peppered_input(canonical, pepper);
    match Argon2::default().verify_password(&input, &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(VaultError::invalid_config(format!(
            "argon2 verification failed: {}",
            e
        ))),
    }
}

fn argon2_for(params: &ArgonParams) -> Result<Argon2<'static>, VaultError> {
    let inner = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(params.key_length as usize),
    )
    .map_err(|e| VaultError::invalid_config(format!("invalid argon2 parameters: {}", e)))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, inner))
}

/// Concatenates the canonical bytes with the pepper into a buffer that is
/// zeroized when dropped.
fn peppered_input(canonical: &[u8], pepper: &Pepper) -> Zeroizing<Vec<u8>> {
    let mut input = Zeroizing::new(Vec::with_capacity(canonical.len() + 32));
    input.extend_from_slice(canonical);
    input.extend_from_slice(pepper.as_bytes());
    input
}
