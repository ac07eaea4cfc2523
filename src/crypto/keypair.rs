// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! RSA Key Pairs
//!
//! Each principal (gateway, client) owns one RSA key pair for the lifetime of
//! the process. The public half crosses the process boundary as SPKI PEM,
//! the same framing the browser's `crypto.subtle.exportKey("spki")` produces
//! once wrapped at 64 columns.
//!
//! ## Security Considerations
//!
//! - Private keys are never logged and never appear in `Debug` output
//! - Exported private PEM is returned in a zeroizing buffer
//! - Peer keys below 2048 bits are rejected

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

use super::CryptoError;

/// Smallest accepted RSA modulus
pub const MIN_MODULUS_BITS: usize = 2048;

const PEM_PUBLIC_BEGIN: &str = "-----BEGIN PUBLIC KEY-----";
const PEM_PUBLIC_END: &str = "-----END PUBLIC KEY-----";

/// An RSA key pair owned by one principal
#[derive(Clone)]
pub struct KeyPair {
    public: RsaPublicKey,
    private: RsaPrivateKey,
}

impl KeyPair {
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    /// Modulus size in bits
    pub fn modulus_bits(&self) -> usize {
        self.public.size() * 8
    }

    /// Export the public key as SPKI PEM (64 columns, LF)
    pub fn public_key_pem(&self) -> Result<String, CryptoError> {
        self.public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::encryption("public_key_pem", e))
    }

    /// Export the private key as PKCS#8 PEM
    pub fn private_key_pem(&self) -> Result<Zeroizing<String>, CryptoError> {
        self.private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::encryption("private_key_pem", e))
    }

    /// Re-import a key pair from PKCS#8 PEM
    pub fn from_private_key_pem(pem: &str) -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| CryptoError::InvalidKey {
            key_type: "private_key".to_string(),
            reason: e.to_string(),
        })?;
        let public = RsaPublicKey::from(&private);
        check_modulus(&public, "private_key")?;
        Ok(Self { public, private })
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("modulus_bits", &self.modulus_bits())
            .field("private", &"<redacted>")
            .finish()
    }
}

/// Generates RSA key pairs of a fixed modulus size
#[derive(Debug, Clone, Copy)]
pub struct KeyPairProvider {
    modulus_bits: usize,
}

impl KeyPairProvider {
    /// Create a provider for `modulus_bits`-bit keys
    pub fn new(modulus_bits: usize) -> Self {
        Self { modulus_bits }
    }

    pub fn modulus_bits(&self) -> usize {
        self.modulus_bits
    }

    /// Generate a fresh key pair from the OS CSPRNG
    ///
    /// # Errors
    ///
    /// - Configured modulus is below [`MIN_MODULUS_BITS`]
    /// - Prime generation fails
    pub fn generate(&self) -> Result<KeyPair, CryptoError> {
        if self.modulus_bits < MIN_MODULUS_BITS {
            return Err(CryptoError::KeyGeneration {
                reason: format!(
                    "modulus of {} bits is below the {} bit minimum",
                    self.modulus_bits, MIN_MODULUS_BITS
                ),
            });
        }

        let private = RsaPrivateKey::new(&mut OsRng, self.modulus_bits).map_err(|e| {
            CryptoError::KeyGeneration {
                reason: e.to_string(),
            }
        })?;
        let public = RsaPublicKey::from(&private);

        debug!("Generated RSA-{} key pair", self.modulus_bits);

        Ok(KeyPair { public, private })
    }
}

impl Default for KeyPairProvider {
    fn default() -> Self {
        Self::new(MIN_MODULUS_BITS)
    }
}

/// Parse a peer's SPKI PEM public key
///
/// Well-formed RFC 7468 PEM goes through the standard decoder. Anything else
/// falls back to a lenient reading where whitespace inside the body is
/// ignored, so CRLF line endings, unwrapped bodies and text outside the
/// BEGIN/END markers are all accepted.
pub fn parse_public_key_pem(pem: &str) -> Result<RsaPublicKey, CryptoError> {
    let key = match RsaPublicKey::from_public_key_pem(pem.trim()) {
        Ok(key) => key,
        Err(e) => {
            debug!("Strict PEM decode failed ({}), trying lenient body", e);
            parse_lenient_pem(pem)?
        }
    };

    check_modulus(&key, "public_key")?;
    Ok(key)
}

fn parse_lenient_pem(pem: &str) -> Result<RsaPublicKey, CryptoError> {
    let invalid = |reason: String| CryptoError::InvalidKey {
        key_type: "public_key".to_string(),
        reason,
    };

    let start = pem
        .find(PEM_PUBLIC_BEGIN)
        .ok_or_else(|| invalid("missing BEGIN PUBLIC KEY marker".to_string()))?
        + PEM_PUBLIC_BEGIN.len();
    let end = pem[start..]
        .find(PEM_PUBLIC_END)
        .ok_or_else(|| invalid("missing END PUBLIC KEY marker".to_string()))?
        + start;

    let body: String = pem[start..end]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if body.is_empty() {
        return Err(invalid("empty key body".to_string()));
    }

    let der = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| invalid(format!("base64 decode error: {}", e)))?;
    RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| invalid(format!("not an RSA SPKI key: {}", e)))
}

fn check_modulus(key: &RsaPublicKey, key_type: &str) -> Result<(), CryptoError> {
    let bits = key.size() * 8;
    if bits < MIN_MODULUS_BITS {
        return Err(CryptoError::InvalidKey {
            key_type: key_type.to_string(),
            reason: format!("{} bit modulus is below the {} bit minimum", bits, MIN_MODULUS_BITS),
        });
    }
    Ok(())
}
