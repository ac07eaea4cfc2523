// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// End-to-end tests for the payment exchange

use secure_payment_gateway::config::GatewayConfig;
use secure_payment_gateway::crypto::{
    CryptoError, HybridCipher, KeyPair, KeyPairProvider, TagLayout, TransactionTokenGenerator,
};
use secure_payment_gateway::payments::{
    GatewayError, PaymentGateway, PaymentRecord, PaymentResponse, TransactionStatus,
    ValidationError, ENCRYPTION_SCHEME,
};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

fn gateway_keys() -> Arc<KeyPair> {
    static KEYS: OnceLock<Arc<KeyPair>> = OnceLock::new();
    KEYS.get_or_init(|| Arc::new(KeyPairProvider::default().generate().unwrap()))
        .clone()
}

fn client_keys() -> &'static KeyPair {
    static KEYS: OnceLock<KeyPair> = OnceLock::new();
    KEYS.get_or_init(|| KeyPairProvider::default().generate().unwrap())
}

fn gateway() -> PaymentGateway {
    PaymentGateway::new(gateway_keys(), &GatewayConfig::default())
        .with_processing_delay(Duration::ZERO)
}

fn payment(amount: f64) -> PaymentRecord {
    PaymentRecord {
        card_number: "4532015112830366".to_string(),
        card_holder: "Ana Torres".to_string(),
        expiry_date: "12/27".to_string(),
        cvv: "123".to_string(),
        amount,
    }
}

#[cfg(test)]
mod gateway_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_exchange() {
        let gateway = gateway();
        let client_cipher = HybridCipher::default();

        let json = serde_json::to_string(&payment(99.99)).unwrap();
        let envelope = client_cipher
            .encrypt(&json, gateway.keys().public_key())
            .unwrap();
        let client_pem = client_keys().public_key_pem().unwrap();

        let sealed = gateway.process_payment(&envelope, &client_pem).await.unwrap();
        let reply = client_cipher
            .decrypt(&sealed, client_keys().private_key())
            .unwrap();
        let response: PaymentResponse = serde_json::from_str(&reply).unwrap();

        assert!(response.success);
        assert_eq!(response.transaction.amount, 99.99);
        assert_eq!(response.transaction.currency, "MXN");
        assert_eq!(response.transaction.card_last4, "0366");
        assert_eq!(response.transaction.card_holder, "Ana Torres");
        assert_eq!(response.transaction.status, TransactionStatus::Approved);
        assert!(TransactionTokenGenerator::new().is_well_formed(&response.transaction.token));
        assert!(response.security.encrypted);
        assert_eq!(response.security.algorithm, ENCRYPTION_SCHEME);
    }

    #[tokio::test]
    async fn test_reply_matches_inbound_tag_layout() {
        let gateway = gateway();
        let client_pem = client_keys().public_key_pem().unwrap();
        let json = serde_json::to_string(&payment(99.99)).unwrap();

        for layout in [TagLayout::Embedded, TagLayout::Detached] {
            let client_cipher = HybridCipher::default().with_tag_layout(layout);
            let envelope = client_cipher
                .encrypt(&json, gateway.keys().public_key())
                .unwrap();
            assert_eq!(envelope.tag_layout(), layout);

            let sealed = gateway.process_payment(&envelope, &client_pem).await.unwrap();
            assert_eq!(sealed.tag_layout(), layout);
            assert_eq!(sealed.auth_tag.is_empty(), layout == TagLayout::Embedded);

            let reply = client_cipher
                .decrypt(&sealed, client_keys().private_key())
                .unwrap();
            let response: PaymentResponse = serde_json::from_str(&reply).unwrap();
            assert!(response.success);
        }
    }

    #[tokio::test]
    async fn test_reply_hides_card_secrets() {
        let gateway = gateway();
        let json = serde_json::to_string(&payment(10.0)).unwrap();
        let envelope = HybridCipher::default()
            .encrypt(&json, gateway.keys().public_key())
            .unwrap();
        let client_pem = client_keys().public_key_pem().unwrap();

        let sealed = gateway.process_payment(&envelope, &client_pem).await.unwrap();
        let reply = HybridCipher::default()
            .decrypt(&sealed, client_keys().private_key())
            .unwrap();

        assert!(!reply.contains("4532015112830366"));
        assert!(!reply.contains("\"cvv\""));
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let gateway = gateway();
        let client_pem = client_keys().public_key_pem().unwrap();
        let mut tokens = std::collections::HashSet::new();

        for _ in 0..3 {
            let json = serde_json::to_string(&payment(1.0)).unwrap();
            let envelope = HybridCipher::default()
                .encrypt(&json, gateway.keys().public_key())
                .unwrap();
            let sealed = gateway.process_payment(&envelope, &client_pem).await.unwrap();
            let reply = HybridCipher::default()
                .decrypt(&sealed, client_keys().private_key())
                .unwrap();
            let response: PaymentResponse = serde_json::from_str(&reply).unwrap();
            assert!(tokens.insert(response.transaction.token));
        }
    }

    #[tokio::test]
    async fn test_amount_over_ceiling_rejected() {
        let gateway = gateway();
        let json = serde_json::to_string(&payment(10_000.01)).unwrap();
        let envelope = HybridCipher::default()
            .encrypt(&json, gateway.keys().public_key())
            .unwrap();
        let client_pem = client_keys().public_key_pem().unwrap();

        let result = gateway.process_payment(&envelope, &client_pem).await;
        assert!(matches!(
            result,
            Err(GatewayError::Validation(ValidationError::InvalidAmount { .. }))
        ));
    }

    #[tokio::test]
    async fn test_envelope_for_other_key_rejected() {
        let gateway = gateway();
        let json = serde_json::to_string(&payment(5.0)).unwrap();
        // Sealed for the client key instead of the gateway key.
        let envelope = HybridCipher::default()
            .encrypt(&json, client_keys().public_key())
            .unwrap();
        let client_pem = client_keys().public_key_pem().unwrap();

        let result = gateway.process_payment(&envelope, &client_pem).await;
        assert!(matches!(
            result,
            Err(GatewayError::Crypto(CryptoError::KeyUnwrap { .. }))
        ));
    }

    #[tokio::test]
    async fn test_processing_delay_is_applied() {
        let gateway = gateway().with_processing_delay(Duration::from_millis(50));
        let json = serde_json::to_string(&payment(5.0)).unwrap();
        let envelope = HybridCipher::default()
            .encrypt(&json, gateway.keys().public_key())
            .unwrap();
        let client_pem = client_keys().public_key_pem().unwrap();

        let started = std::time::Instant::now();
        gateway.process_payment(&envelope, &client_pem).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
