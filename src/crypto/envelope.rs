// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Envelope wire format
//!
//! ```json
//! { "encryptedData": "<base64>", "encryptedKey": "<base64>", "iv": "<base64>",
//!   "authTag": "<base64 or empty>", "timestamp": 1700000000000, "algorithm": "aes-256-gcm" }
//! ```
//!
//! `authTag` is empty when the tag is embedded at the end of `encryptedData`
//! (Web Crypto layout).

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use super::aes_gcm::{NONCE_SIZE, TAG_SIZE};
use super::CryptoError;

/// Cipher identifier carried in every envelope
pub const ENVELOPE_ALGORITHM: &str = "aes-256-gcm";

/// Where the GCM tag travels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagLayout {
    /// Separate `authTag` field
    #[default]
    Detached,
    /// Appended to `encryptedData`, `authTag` empty
    Embedded,
}

/// Serialized output of hybrid encryption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// AES-GCM ciphertext, with the tag appended in the embedded layout
    pub encrypted_data: String,
    /// RSA-OAEP wrapped AES key
    pub encrypted_key: String,
    /// 12-byte GCM nonce
    pub iv: String,
    /// 16-byte GCM tag, or empty
    #[serde(default)]
    pub auth_tag: String,
    /// Creation time, epoch milliseconds
    pub timestamp: i64,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

fn default_algorithm() -> String {
    ENVELOPE_ALGORITHM.to_string()
}

/// Envelope fields after base64 decoding and size checks
#[derive(Debug)]
pub(crate) struct DecodedEnvelope {
    /// `ciphertext | tag`, regardless of wire layout
    pub sealed: Vec<u8>,
    pub wrapped_key: Vec<u8>,
    pub nonce: [u8; NONCE_SIZE],
}

impl Envelope {
    /// Which tag layout this envelope uses on the wire
    pub fn tag_layout(&self) -> TagLayout {
        if self.auth_tag.is_empty() {
            TagLayout::Embedded
        } else {
            TagLayout::Detached
        }
    }

    /// Decode and structurally check every binary field
    pub(crate) fn decode(&self) -> Result<DecodedEnvelope, CryptoError> {
        if !self.algorithm.eq_ignore_ascii_case(ENVELOPE_ALGORITHM) {
            return Err(CryptoError::malformed(
                "algorithm",
                format!("unsupported cipher '{}'", self.algorithm),
            ));
        }

        let nonce_bytes = decode_field("iv", &self.iv)?;
        let nonce: [u8; NONCE_SIZE] = nonce_bytes.as_slice().try_into().map_err(|_| {
            CryptoError::malformed(
                "iv",
                format!("expected {} bytes, got {}", NONCE_SIZE, nonce_bytes.len()),
            )
        })?;

        let wrapped_key = decode_field("encryptedKey", &self.encrypted_key)?;
        if wrapped_key.is_empty() {
            return Err(CryptoError::malformed("encryptedKey", "empty"));
        }

        let mut sealed = decode_field("encryptedData", &self.encrypted_data)?;
        match self.tag_layout() {
            TagLayout::Detached => {
                let tag = decode_field("authTag", &self.auth_tag)?;
                if tag.len() != TAG_SIZE {
                    return Err(CryptoError::malformed(
                        "authTag",
                        format!("expected {} bytes, got {}", TAG_SIZE, tag.len()),
                    ));
                }
                sealed.extend_from_slice(&tag);
            }
            TagLayout::Embedded => {
                if sealed.len() < TAG_SIZE {
                    return Err(CryptoError::malformed(
                        "encryptedData",
                        format!("shorter than the {} byte embedded tag", TAG_SIZE),
                    ));
                }
            }
        }

        Ok(DecodedEnvelope {
            sealed,
            wrapped_key,
            nonce,
        })
    }
}

fn decode_field(field: &str, value: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(value.trim())
        .map_err(|e| CryptoError::malformed(field, format!("base64 decode error: {}", e)))
}
