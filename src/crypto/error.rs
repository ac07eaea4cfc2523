// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Error Types
//!
//! Error taxonomy for the hybrid envelope protocol.
//!
//! ## Error Variants
//!
//! - **KeyGeneration**: RSA key pair generation failed or the requested modulus is too small
//! - **Encryption**: Sealing an envelope failed (bad key, AEAD or OAEP failure)
//! - **Replay**: Envelope timestamp is outside the freshness window
//! - **KeyUnwrap**: RSA-OAEP unwrap of the symmetric key failed
//! - **Integrity**: AES-GCM tag verification failed
//! - **InvalidKey**: A peer public key could not be parsed or is too small
//! - **MalformedEnvelope**: An envelope field is missing, not base64 or has the wrong size
//!
//! None of the variants carry plaintext or key material. Callers facing an
//! untrusted peer should report [`CryptoError::public_message`] and log the
//! `Display` form internally.

use std::fmt;

/// Error type for all envelope cryptography
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key pair generation failed
    KeyGeneration {
        /// Specific failure reason
        reason: String,
    },

    /// Sealing an envelope failed
    Encryption {
        /// Which step was being performed (e.g., "aes_gcm", "rsa_oaep_wrap")
        operation: String,
        /// Specific failure reason
        reason: String,
    },

    /// Envelope is stale, or stamped too far in the future
    ///
    /// `age_ms` is negative for envelopes from the future.
    Replay {
        /// Envelope age at decrypt time
        age_ms: i64,
        /// Configured maximum age
        max_age_ms: u64,
    },

    /// RSA-OAEP unwrap of the symmetric key failed
    ///
    /// This error occurs when:
    /// - The envelope was sealed for a different public key
    /// - The wrapped key has the wrong length for the recipient modulus
    /// - The recovered key is not 32 bytes
    KeyUnwrap {
        /// Specific failure reason
        reason: String,
    },

    /// AES-GCM authentication tag did not verify
    Integrity,

    /// Peer public key is unusable
    InvalidKey {
        /// Type of key that failed (e.g., "client_public_key")
        key_type: String,
        /// Specific failure reason
        reason: String,
    },

    /// Envelope field failed structural validation
    MalformedEnvelope {
        /// Wire name of the field
        field: String,
        /// Specific failure reason
        reason: String,
    },
}

impl CryptoError {
    /// Short machine-readable kind, safe to log and to count
    pub fn kind(&self) -> &'static str {
        match self {
            CryptoError::KeyGeneration { .. } => "key_generation",
            CryptoError::Encryption { .. } => "encryption",
            CryptoError::Replay { .. } => "replay",
            CryptoError::KeyUnwrap { .. } => "key_unwrap",
            CryptoError::Integrity => "integrity",
            CryptoError::InvalidKey { .. } => "invalid_key",
            CryptoError::MalformedEnvelope { .. } => "malformed_envelope",
        }
    }

    /// Generic message for untrusted peers
    pub fn public_message(&self) -> &'static str {
        match self {
            CryptoError::KeyGeneration { .. } | CryptoError::Encryption { .. } => {
                "Unable to encrypt payload"
            }
            CryptoError::InvalidKey { .. } => "Invalid public key",
            _ => "Unable to decrypt payment payload",
        }
    }

    pub(crate) fn malformed(field: &str, reason: impl Into<String>) -> Self {
        CryptoError::MalformedEnvelope {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn encryption(operation: &str, reason: impl fmt::Display) -> Self {
        CryptoError::Encryption {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::KeyGeneration { reason } => {
                write!(f, "Key generation failed: {}", reason)
            }
            CryptoError::Encryption { operation, reason } => {
                write!(f, "Encryption failed during {}: {}", operation, reason)
            }
            CryptoError::Replay { age_ms, max_age_ms } => write!(
                f,
                "Stale or replayed envelope: age {} ms outside window of {} ms",
                age_ms, max_age_ms
            ),
            CryptoError::KeyUnwrap { reason } => {
                write!(f, "Key unwrap failed: {}", reason)
            }
            CryptoError::Integrity => write!(f, "Authentication failed"),
            CryptoError::InvalidKey { key_type, reason } => {
                write!(f, "Invalid key ({}): {}", key_type, reason)
            }
            CryptoError::MalformedEnvelope { field, reason } => {
                write!(f, "Malformed envelope field '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for CryptoError {}

impl From<base64::DecodeError> for CryptoError {
    fn from(err: base64::DecodeError) -> Self {
        CryptoError::MalformedEnvelope {
            field: "base64_field".to_string(),
            reason: format!("base64 decode error: {}", err),
        }
    }
}
