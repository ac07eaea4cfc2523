// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Hybrid Envelope Encryption
//!
//! RSA-OAEP(SHA-256) wraps a fresh AES-256 key; AES-256-GCM encrypts the
//! payload under that key. The RSA operation runs once per envelope on a
//! 32-byte key, so cost is independent of payload size.
//!
//! ## Protocol Flow
//!
//! 1. Sender draws a 32-byte key and a 12-byte nonce from the OS CSPRNG
//! 2. Sender encrypts the UTF-8 payload with AES-256-GCM
//! 3. Sender wraps the key under the recipient's public key with RSA-OAEP
//! 4. Sender stamps the envelope with the current epoch milliseconds
//! 5. Recipient rejects envelopes outside the freshness window
//! 6. Recipient unwraps the key, then verifies the tag and decrypts
//!
//! ## Replay Window
//!
//! Freshness is the only replay defence: there is no cache of seen
//! envelopes, so a captured envelope is accepted again until it ages out of
//! the window. The timestamp is not covered by the GCM tag either (browser
//! clients send no AAD).

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::{rngs::OsRng, RngCore};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::time::Duration;
use zeroize::Zeroizing;

use super::aes_gcm::{decrypt_aes_gcm, encrypt_aes_gcm, split_tag, KEY_SIZE, NONCE_SIZE};
use super::envelope::{Envelope, TagLayout, ENVELOPE_ALGORITHM};
use super::keypair::MIN_MODULUS_BITS;
use super::CryptoError;

/// Default maximum envelope age (5 minutes)
pub const DEFAULT_MAX_AGE: Duration = Duration::from_millis(300_000);
/// Default tolerance for envelopes stamped slightly in the future
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_millis(30_000);

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Seals and opens [`Envelope`]s
///
/// Holds configuration only, no key material or mutable state, so one
/// instance can be shared by any number of concurrent callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HybridCipher {
    max_age_ms: u64,
    clock_skew_ms: u64,
    tag_layout: TagLayout,
}

impl HybridCipher {
    pub fn new(max_age: Duration, clock_skew: Duration) -> Self {
        Self {
            max_age_ms: u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX),
            clock_skew_ms: u64::try_from(clock_skew.as_millis()).unwrap_or(u64::MAX),
            tag_layout: TagLayout::Detached,
        }
    }

    /// Choose the tag layout for sealed envelopes; both are accepted on open
    pub fn with_tag_layout(mut self, tag_layout: TagLayout) -> Self {
        self.tag_layout = tag_layout;
        self
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }

    pub fn tag_layout(&self) -> TagLayout {
        self.tag_layout
    }

    /// Seal `plaintext` for the holder of `recipient`'s private key
    pub fn encrypt(
        &self,
        plaintext: &str,
        recipient: &RsaPublicKey,
    ) -> Result<Envelope, CryptoError> {
        self.encrypt_at(plaintext, recipient, now_millis())
    }

    /// Seal `plaintext`, stamping the envelope with `now_ms`
    pub fn encrypt_at(
        &self,
        plaintext: &str,
        recipient: &RsaPublicKey,
        now_ms: i64,
    ) -> Result<Envelope, CryptoError> {
        if recipient.size() * 8 < MIN_MODULUS_BITS {
            return Err(CryptoError::encryption(
                "rsa_oaep_wrap",
                format!("recipient modulus below {} bits", MIN_MODULUS_BITS),
            ));
        }

        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        OsRng.fill_bytes(&mut key[..]);
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let sealed = encrypt_aes_gcm(plaintext.as_bytes(), &key, &nonce)?;

        let wrapped_key = recipient
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &key[..])
            .map_err(|e| CryptoError::encryption("rsa_oaep_wrap", e))?;

        let (encrypted_data, auth_tag) = match self.tag_layout {
            TagLayout::Detached => {
                let (ciphertext, tag) = split_tag(&sealed)
                    .ok_or_else(|| CryptoError::encryption("aes_gcm", "missing tag"))?;
                (STANDARD.encode(ciphertext), STANDARD.encode(tag))
            }
            TagLayout::Embedded => (STANDARD.encode(&sealed), String::new()),
        };

        Ok(Envelope {
            encrypted_data,
            encrypted_key: STANDARD.encode(wrapped_key),
            iv: STANDARD.encode(nonce),
            auth_tag,
            timestamp: now_ms,
            algorithm: ENVELOPE_ALGORITHM.to_string(),
        })
    }

    /// Open an envelope sealed for `recipient`
    ///
    /// # Errors
    ///
    /// - [`CryptoError::Replay`] if the envelope is outside the freshness window
    /// - [`CryptoError::MalformedEnvelope`] on structural problems
    /// - [`CryptoError::KeyUnwrap`] if the key was wrapped for someone else
    /// - [`CryptoError::Integrity`] if the tag does not verify
    pub fn decrypt(
        &self,
        envelope: &Envelope,
        recipient: &RsaPrivateKey,
    ) -> Result<String, CryptoError> {
        self.decrypt_at(envelope, recipient, now_millis())
    }

    /// Open an envelope, judging freshness against `now_ms`
    pub fn decrypt_at(
        &self,
        envelope: &Envelope,
        recipient: &RsaPrivateKey,
        now_ms: i64,
    ) -> Result<String, CryptoError> {
        // Freshness is checked before any key material is touched.
        self.check_freshness(envelope.timestamp, now_ms)?;

        let decoded = envelope.decode()?;

        if decoded.wrapped_key.len() != recipient.size() {
            return Err(CryptoError::KeyUnwrap {
                reason: format!(
                    "wrapped key is {} bytes, recipient modulus is {} bytes",
                    decoded.wrapped_key.len(),
                    recipient.size()
                ),
            });
        }

        let unwrapped = Zeroizing::new(
            recipient
                .decrypt(Oaep::new::<Sha256>(), &decoded.wrapped_key)
                .map_err(|_| CryptoError::KeyUnwrap {
                    reason: "OAEP decryption failed".to_string(),
                })?,
        );
        let key: Zeroizing<[u8; KEY_SIZE]> = Zeroizing::new(
            unwrapped
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::KeyUnwrap {
                    reason: format!(
                        "expected {} byte key, got {}",
                        KEY_SIZE,
                        unwrapped.len()
                    ),
                })?,
        );

        let plaintext = decrypt_aes_gcm(&decoded.sealed, &key, &decoded.nonce)?;

        String::from_utf8(plaintext)
            .map_err(|_| CryptoError::malformed("encryptedData", "plaintext is not valid UTF-8"))
    }

    /// Reject timestamps older than the window or too far in the future
    pub fn check_freshness(&self, timestamp_ms: i64, now_ms: i64) -> Result<(), CryptoError> {
        let age_ms = now_ms.saturating_sub(timestamp_ms);
        let max_age = i64::try_from(self.max_age_ms).unwrap_or(i64::MAX);
        let skew = i64::try_from(self.clock_skew_ms).unwrap_or(i64::MAX);
        let too_old = age_ms > max_age;
        let from_future = age_ms < skew.saturating_neg();

        if too_old || from_future {
            return Err(CryptoError::Replay {
                age_ms,
                max_age_ms: self.max_age_ms,
            });
        }
        Ok(())
    }
}

impl Default for HybridCipher {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE, DEFAULT_CLOCK_SKEW)
    }
}
