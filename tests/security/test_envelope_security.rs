// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Security tests for payment envelopes
//!
//! Tests cover:
//! - Ciphertext, tag and nonce tampering
//! - Key substitution
//! - Stale and future-dated envelopes
//! - Error messages that do not leak key or card material

use base64::{engine::general_purpose::STANDARD, Engine as _};
use secure_payment_gateway::api::ApiError;
use secure_payment_gateway::crypto::{
    CryptoError, Envelope, HybridCipher, KeyPair, KeyPairProvider, TagLayout,
};
use secure_payment_gateway::payments::{GatewayError, PaymentRecord};
use std::sync::OnceLock;

const NOW: i64 = 1_700_000_000_000;

fn recipient() -> &'static KeyPair {
    static KEYS: OnceLock<KeyPair> = OnceLock::new();
    KEYS.get_or_init(|| KeyPairProvider::default().generate().unwrap())
}

fn intruder() -> &'static KeyPair {
    static KEYS: OnceLock<KeyPair> = OnceLock::new();
    KEYS.get_or_init(|| KeyPairProvider::default().generate().unwrap())
}

fn sealed(layout: TagLayout) -> Envelope {
    HybridCipher::default()
        .with_tag_layout(layout)
        .encrypt_at(
            r#"{"cardNumber":"4532015112830366","cvv":"123"}"#,
            recipient().public_key(),
            NOW,
        )
        .unwrap()
}

fn flip_bit(field: &str, index: usize) -> String {
    let mut bytes = STANDARD.decode(field).unwrap();
    bytes[index] ^= 0x01;
    STANDARD.encode(bytes)
}

fn open(envelope: &Envelope) -> Result<String, CryptoError> {
    HybridCipher::default().decrypt_at(envelope, recipient().private_key(), NOW)
}

#[cfg(test)]
mod envelope_security_tests {
    use super::*;

    #[test]
    fn test_ciphertext_bit_flip_detected() {
        for layout in [TagLayout::Detached, TagLayout::Embedded] {
            let mut envelope = sealed(layout);
            envelope.encrypted_data = flip_bit(&envelope.encrypted_data, 0);
            assert_eq!(open(&envelope), Err(CryptoError::Integrity));
        }
    }

    #[test]
    fn test_tag_bit_flip_detected() {
        let mut envelope = sealed(TagLayout::Detached);
        envelope.auth_tag = flip_bit(&envelope.auth_tag, 15);
        assert_eq!(open(&envelope), Err(CryptoError::Integrity));

        let mut envelope = sealed(TagLayout::Embedded);
        let len = STANDARD.decode(&envelope.encrypted_data).unwrap().len();
        envelope.encrypted_data = flip_bit(&envelope.encrypted_data, len - 1);
        assert_eq!(open(&envelope), Err(CryptoError::Integrity));
    }

    #[test]
    fn test_nonce_change_detected() {
        let mut envelope = sealed(TagLayout::Detached);
        envelope.iv = flip_bit(&envelope.iv, 3);
        assert_eq!(open(&envelope), Err(CryptoError::Integrity));
    }

    #[test]
    fn test_wrapped_key_tampering_detected() {
        let mut envelope = sealed(TagLayout::Detached);
        envelope.encrypted_key = flip_bit(&envelope.encrypted_key, 10);
        assert!(matches!(
            open(&envelope),
            Err(CryptoError::KeyUnwrap { .. }) | Err(CryptoError::Integrity)
        ));
    }

    #[test]
    fn test_truncated_wrapped_key() {
        let mut envelope = sealed(TagLayout::Detached);
        let mut key = STANDARD.decode(&envelope.encrypted_key).unwrap();
        key.truncate(128);
        envelope.encrypted_key = STANDARD.encode(key);
        assert!(matches!(open(&envelope), Err(CryptoError::KeyUnwrap { .. })));
    }

    #[test]
    fn test_wrong_private_key() {
        let envelope = sealed(TagLayout::Detached);
        let result = HybridCipher::default().decrypt_at(&envelope, intruder().private_key(), NOW);
        assert!(matches!(result, Err(CryptoError::KeyUnwrap { .. })));
    }

    #[test]
    fn test_swapped_wrapped_key() {
        // Key from one envelope, body from another.
        let a = sealed(TagLayout::Detached);
        let mut b = sealed(TagLayout::Detached);
        b.encrypted_key = a.encrypted_key;
        assert_eq!(open(&b), Err(CryptoError::Integrity));
    }

    #[test]
    fn test_stale_and_future_envelopes() {
        let cipher = HybridCipher::default();
        let envelope = sealed(TagLayout::Detached);

        assert!(matches!(
            cipher.decrypt_at(&envelope, recipient().private_key(), NOW + 300_001),
            Err(CryptoError::Replay { .. })
        ));
        assert!(matches!(
            cipher.decrypt_at(&envelope, recipient().private_key(), NOW - 30_001),
            Err(CryptoError::Replay { .. })
        ));
    }

    #[test]
    fn test_errors_do_not_leak_material() {
        let mut envelope = sealed(TagLayout::Detached);
        envelope.encrypted_data = flip_bit(&envelope.encrypted_data, 0);
        let err = open(&envelope).unwrap_err();

        let rendered = format!("{} {:?}", err, err);
        assert!(!rendered.contains(&envelope.encrypted_key));
        assert!(!rendered.contains("4532015112830366"));

        let api: ApiError = GatewayError::Crypto(err).into();
        let body = serde_json::to_string(&api.to_response()).unwrap();
        assert!(!body.contains("integrity"));
        assert!(!body.contains("tag"));
    }

    #[test]
    fn test_payment_record_debug_masks_card() {
        let record = PaymentRecord {
            card_number: "4532015112830366".to_string(),
            card_holder: "Ana Torres".to_string(),
            expiry_date: "12/27".to_string(),
            cvv: "987".to_string(),
            amount: 1.0,
        };
        let debug = format!("{:?}", record);

        assert!(!debug.contains("4532015112830366"));
        assert!(debug.contains("0366"));
        assert!(!debug.contains("987"));
    }

    #[test]
    fn test_keypair_debug_redacted() {
        let debug = format!("{:?}", recipient());
        assert!(debug.contains("redacted"));
        assert!(!debug.contains("BEGIN"));
    }
}
