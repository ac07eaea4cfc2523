// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! AES-256-GCM payload encryption
//!
//! Symmetric half of the hybrid envelope. Output layout matches the
//! Web Crypto API, which appends the tag to the ciphertext:
//!
//! ```text
//! [ciphertext (len = plaintext) | tag (16 bytes)]
//! ```
//!
//! - Key: 32 bytes (256 bits), fresh per envelope
//! - Nonce: 12 bytes (96 bits), fresh per envelope
//! - No Additional Authenticated Data (AAD), matches Web Crypto default

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};

use super::CryptoError;

/// AES-256 key size in bytes
pub const KEY_SIZE: usize = 32;
/// GCM nonce size in bytes
pub const NONCE_SIZE: usize = 12;
/// GCM tag size in bytes
pub const TAG_SIZE: usize = 16;

/// Encrypt `plaintext` and return `ciphertext | tag`
///
/// # Security
///
/// **CRITICAL**: Never reuse the same nonce with the same key.
pub fn encrypt_aes_gcm(
    plaintext: &[u8],
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CryptoError::encryption("aes_gcm", e))?;

    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad: b"",
            },
        )
        .map_err(|e| CryptoError::encryption("aes_gcm", e))
}

/// Decrypt `ciphertext | tag`, verifying the tag first
///
/// Returns [`CryptoError::Integrity`] on any tag mismatch (wrong key,
/// tampered ciphertext, tampered nonce or truncated input). No bytes are
/// returned unless verification succeeds.
pub fn decrypt_aes_gcm(
    sealed: &[u8],
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < TAG_SIZE {
        return Err(CryptoError::Integrity);
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Integrity)?;

    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: sealed,
                aad: b"",
            },
        )
        .map_err(|_| CryptoError::Integrity)
}

/// Split `ciphertext | tag` into its two halves
///
/// Returns `None` when the input is shorter than a tag.
pub fn split_tag(sealed: &[u8]) -> Option<(&[u8], &[u8])> {
    if sealed.len() < TAG_SIZE {
        return None;
    }
    Some(sealed.split_at(sealed.len() - TAG_SIZE))
}
