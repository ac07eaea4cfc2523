// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Hybrid Envelope Encryption Module
//!
//! Cryptographic primitives for exchanging payment data between an untrusted
//! client and the gateway:
//!
//! - **Key Pairs**: RSA-2048+ key generation and SPKI PEM import/export
//! - **AES-GCM**: AES-256-GCM payload encryption (Web Crypto compatible)
//! - **Envelope**: JSON wire format bundling ciphertext, wrapped key, nonce, tag
//! - **Hybrid**: RSA-OAEP(SHA-256) key wrapping plus freshness enforcement
//! - **Tokens**: CSPRNG transaction identifiers
//!
//! ## Security Considerations
//!
//! - A fresh AES key and nonce are drawn for every envelope
//! - Tags are verified before any plaintext is returned
//! - Envelopes older than the freshness window are rejected, but replays
//!   inside the window are not detected
//! - Key material is never logged

pub mod aes_gcm;
pub mod envelope;
pub mod error;
pub mod hybrid;
pub mod keypair;
pub mod token;

pub use envelope::{Envelope, TagLayout, ENVELOPE_ALGORITHM};
pub use error::CryptoError;
pub use hybrid::{now_millis, HybridCipher, DEFAULT_CLOCK_SKEW, DEFAULT_MAX_AGE};
pub use keypair::{parse_public_key_pem, KeyPair, KeyPairProvider, MIN_MODULUS_BITS};
pub use token::TransactionTokenGenerator;
