// /////////////////////////////////////////////////////////////////////////////
// Field Vault
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Streaming AEAD
//!
//! Chunked authenticated encryption for bulk payloads that do not fit the
//! single-shot primitive. The stream is split into 64 KiB plaintext chunks;
//! each chunk is an independent AES-256-GCM message whose nonce binds it to
//! both its position and its stream:
//!
//! ```text
//! nonce  = [8-byte LE chunk index][4-byte stream id]
//! output = [4-byte stream id]
//!          [u32 LE ciphertext-length][ciphertext+tag]   (repeated)
//!          [u32 LE ciphertext-length][ciphertext+tag]   (empty final chunk)
//! ```
//!
//! The stream id is drawn once per stream from the CSPRNG and written as the
//! first four bytes of output, so chunks from two streams under the same key
//! can never be spliced together. The end-of-stream marker is an *encrypted*
//! zero-length chunk: it authenticates at the expected index, which is what
//! distinguishes natural termination from truncation at a chunk boundary.
//!
//! Decryption fails with `AuthenticationFailed` on any chunk whose tag does
//! not verify, whose index does not match the expected sequence, or when the
//! stream ends without the final marker.

use std::io::{Read, Write};

use aes_gcm::{AeadInPlace, Aes256Gcm, Key, KeyInit, Nonce};
use ring::rand::{SecureRandom, SystemRandom};

use field_vault_domain::VaultError;

use super::aead::{KEY_LENGTH, NONCE_LENGTH, TAG_LENGTH};

/// Plaintext chunk size in bytes (64 KiB)
pub const CHUNK_SIZE: usize = 64 * 1024;
/// Stream id length in bytes
pub const STREAM_ID_LENGTH: usize = 4;

/// Encrypts everything `reader` yields into `writer`, returning the number
/// of plaintext bytes consumed.
pub fn encrypt_stream<R: Read, W: Write>(
    key: &[u8],
    mut reader: R,
    mut writer: W,
) -> Result<u64, VaultError> {
    let cipher = cipher_for(key)?;

    let mut stream_id = [0u8; STREAM_ID_LENGTH];
    SystemRandom::new()
        .fill(&mut stream_id)
        .map_err(|_| VaultError::io_error("failed to generate stream id"))?;
    writer
        .write_all(&stream_id)
        .map_err(|e| VaultError::io_error(format!("failed to write stream header: {}", e)))?;

    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut index: u64 = 0;
    let mut total: u64 = 0;

    loop {
        let filled = fill_chunk(&mut reader, &mut chunk)?;
        total += filled as u64;

        if filled > 0 {
            write_chunk(&cipher, &stream_id, index, &chunk[..filled], &mut writer)?;
            index += 1;
        }

        if filled < CHUNK_SIZE {
            // End of input: seal the authenticated empty marker chunk
            write_chunk(&cipher, &stream_id, index, &[], &mut writer)?;
            break;
        }
    }

    writer
        .flush()
        .map_err(|e| VaultError::io_error(format!("failed to flush stream: {}", e)))?;
    Ok(total)
}

/// Decrypts a stream produced by [`encrypt_stream`] into `writer`, returning
/// the number of plaintext bytes recovered.
pub fn decrypt_stream<R: Read, W: Write>(
    key: &[u8],
    mut reader: R,
    mut writer: W,
) -> Result<u64, VaultError> {
    let cipher = cipher_for(key)?;

    let mut stream_id = [0u8; STREAM_ID_LENGTH];
    reader
        .read_exact(&mut stream_id)
        .map_err(|_| VaultError::authentication_failed("stream is missing its header"))?;

    let mut index: u64 = 0;
    let mut total: u64 = 0;

    loop {
        let mut length_bytes = [0u8; 4];
        reader.read_exact(&mut length_bytes).map_err(|_| {
            VaultError::authentication_failed("stream truncated before final chunk")
        })?;
        let length = u32::from_le_bytes(length_bytes) as usize;

        if length < TAG_LENGTH || length > CHUNK_SIZE + TAG_LENGTH {
            return Err(VaultError::authentication_failed(format!(
                "chunk {} has implausible length {}",
                index, length
            )));
        }

        let mut buffer = vec![0u8; length];
        reader.read_exact(&mut buffer).map_err(|_| {
            VaultError::authentication_failed("stream truncated inside a chunk")
        })?;

        let nonce = chunk_nonce(&stream_id, index);
        cipher
            .decrypt_in_place(Nonce::from_slice(&nonce), b"", &mut buffer)
            .map_err(|_| {
                VaultError::authentication_failed(format!(
                    "chunk {} failed authentication",
                    index
                ))
            })?;

        if buffer.is_empty() {
            // Final marker; nothing may follow it
            let mut trailing = [0u8; 1];
            match reader.read(&mut trailing) {
                Ok(0) => break,
                Ok(_) => {
                    return Err(VaultError::authentication_failed(
                        "data found after the final chunk",
                    ))
                }
                Err(e) => {
                    return Err(VaultError::io_error(format!(
                        "failed to read stream tail: {}",
                        e
                    )))
                }
            }
        }

        writer
            .write_all(&buffer)
            .map_err(|e| VaultError::io_error(format!("failed to write plaintext: {}", e)))?;
        total += buffer.len() as u64;
        index += 1;
    }

    writer
        .flush()
        .map_err(|e| VaultError::io_error(format!("failed to flush plaintext: {}", e)))?;
    Ok(total)
}

fn cipher_for(key: &[u8]) -> Result<Aes256Gcm, VaultError> {
    if key.len() != KEY_LENGTH {
        return Err(VaultError::invalid_key(format!(
            "stream cipher requires a {}-byte key, got {}",
            KEY_LENGTH,
            key.len()
        )));
    }
    Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)))
}

fn chunk_nonce(stream_id: &[u8; STREAM_ID_LENGTH], index: u64) -> [u8; NONCE_LENGTH] {
    let mut nonce = [0u8; NONCE_LENGTH];
    nonce[..8].copy_from_slice(&index.to_le_bytes());
    nonce[8..].copy_from_slice(stream_id);
    nonce
}

/// Reads until the chunk is full or the reader is exhausted, tolerating
/// short reads from the underlying source.
fn fill_chunk<R: Read>(reader: &mut R, chunk: &mut [u8]) -> Result<usize, VaultError> {
    let mut filled = 0;
    while filled < chunk.len() {
        match reader.read(&mut chunk[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(VaultError::io_error(format!(
                    "failed to read plaintext: {}",
                    e
                )))
            }
        }
    }
    Ok(filled)
}

fn write_chunk<W: Write>(
    cipher: &Aes256Gcm,
    stream_id: &[u8; STREAM_ID_LENGTH],
    index: u64,
    plaintext: &[u8],
    writer: &mut W,
) -> Result<(), VaultError> {
    let nonce = chunk_nonce(stream_id, index);
    let mut buffer = plaintext.to_vec();
    cipher
        .encrypt_in_place(Nonce::from_slice(&nonce), b"", &mut buffer)
        .map_err(|_| VaultError::io_error("stream chunk encryption failed"))?;

    let length = buffer.len() as u32;
    writer
        .write_all(&length.to_le_bytes())
        .map_err(|e| VaultError::io_error(format!("failed to write chunk length: {}", e)))?;
    writer
        .write_all(&buffer)
        .map_err(|e| VaultError::io_error(format!("failed to write chunk: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn test_key() -> [u8; KEY_LENGTH] {
        [0x24; KEY_LENGTH]
    }

    fn encrypt_to_vec(plaintext: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let consumed = encrypt_stream(&test_key(), Cursor::new(plaintext), &mut out).unwrap();
        assert_eq!(consumed, plaintext.len() as u64);
        out
    }

    fn decrypt_to_vec(stream: &[u8]) -> Result<Vec<u8>, VaultError> {
        let mut out = Vec::new();
        decrypt_stream(&test_key(), Cursor::new(stream), &mut out)?;
        Ok(out)
    }

    #[test]
    fn test_round_trip_small() {
        let plaintext = b"well under one chunk".to_vec();
        let stream = encrypt_to_vec(&plaintext);
        assert_eq!(decrypt_to_vec(&stream).unwrap(), plaintext);
    }

    #[test]
    fn test_round_trip_multi_chunk() {
        // Spans two full chunks plus a partial third
        let plaintext: Vec<u8> = (0..CHUNK_SIZE * 2 + 513).map(|i| (i % 251) as u8).collect();
        let stream = encrypt_to_vec(&plaintext);
        assert_eq!(decrypt_to_vec(&stream).unwrap(), plaintext);
    }

    #[test]
    fn test_round_trip_exact_chunk_boundary() {
        let plaintext = vec![7u8; CHUNK_SIZE];
        let stream = encrypt_to_vec(&plaintext);
        assert_eq!(decrypt_to_vec(&stream).unwrap(), plaintext);
    }

    #[test]
    fn test_empty_stream() {
        let stream = encrypt_to_vec(&[]);
        // stream id + one marker chunk
        assert_eq!(stream.len(), STREAM_ID_LENGTH + 4 + TAG_LENGTH);
        assert_eq!(decrypt_to_vec(&stream).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_truncation_detected() {
        let stream = encrypt_to_vec(b"some payload");
        // Drop the final marker chunk entirely
        let truncated = &stream[..stream.len() - (4 + TAG_LENGTH)];
        assert!(matches!(
            decrypt_to_vec(truncated),
            Err(VaultError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_tampered_chunk_detected() {
        let mut stream = encrypt_to_vec(b"some payload");
        let middle = STREAM_ID_LENGTH + 4 + 3;
        stream[middle] ^= 0x01;
        assert!(matches!(
            decrypt_to_vec(&stream),
            Err(VaultError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_chunk_reorder_detected() {
        let plaintext: Vec<u8> = (0..CHUNK_SIZE * 2).map(|i| (i % 7) as u8).collect();
        let stream = encrypt_to_vec(&plaintext);

        // Swap the two full data chunks; lengths are identical so the frame
        // structure stays valid, only the indices disagree
        let chunk_len = 4 + CHUNK_SIZE + TAG_LENGTH;
        let first = STREAM_ID_LENGTH;
        let second = first + chunk_len;
        let mut reordered = stream.clone();
        reordered[first..first + chunk_len].copy_from_slice(&stream[second..second + chunk_len]);
        reordered[second..second + chunk_len].copy_from_slice(&stream[first..first + chunk_len]);

        assert!(matches!(
            decrypt_to_vec(&reordered),
            Err(VaultError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_cross_stream_splice_detected() {
        let a = encrypt_to_vec(b"stream a payload");
        let b = encrypt_to_vec(b"stream b payload");

        // Graft stream b's chunks onto stream a's header
        let mut spliced = a[..STREAM_ID_LENGTH].to_vec();
        spliced.extend_from_slice(&b[STREAM_ID_LENGTH..]);

        assert!(matches!(
            decrypt_to_vec(&spliced),
            Err(VaultError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_trailing_garbage_detected() {
        let mut stream = encrypt_to_vec(b"payload");
        stream.push(0x00);
        assert!(matches!(
            decrypt_to_vec(&stream),
            Err(VaultError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_wrong_key_length() {
        let mut out = Vec::new();
        assert!(matches!(
            encrypt_stream(&[0u8; 16], Cursor::new(b"x".as_slice()), &mut out),
            Err(VaultError::InvalidKey(_))
        ));
    }
}
