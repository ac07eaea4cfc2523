// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Payment Gateway
//!
//! Orchestrates one encrypted payment exchange:
//!
//! 1. Parse the client's public key
//! 2. Open the inbound envelope with the gateway's private key
//! 3. Run the validation pipeline over the decrypted record
//! 4. Simulate approval (fixed delay) and issue a transaction token
//! 5. Seal the response for the client's public key
//!
//! Approval always succeeds once validation passes; there is no card network
//! behind this.

use chrono::SecondsFormat;
use rsa::RsaPublicKey;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::record::{
    PaymentRecord, PaymentResponse, SecurityInfo, TransactionResult, TransactionStatus,
};
use super::validator::{card_last4, mask_card_number, CardValidator, ValidationError};
use crate::config::GatewayConfig;
use crate::crypto::{
    now_millis, parse_public_key_pem, CryptoError, Envelope, HybridCipher, KeyPair, TagLayout,
    TransactionTokenGenerator,
};

/// Human-readable description of the envelope scheme
pub const ENCRYPTION_SCHEME: &str = "RSA-2048 + AES-256-GCM";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid client public key: {0}")]
    InvalidClientKey(#[source] CryptoError),

    #[error("Envelope rejected: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Payment rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to serialize response: {0}")]
    Serialization(String),
}

/// Decrypt → validate → approve → encrypt
///
/// Holds the gateway key pair behind an `Arc`; it is generated once at
/// startup and never mutated, so the gateway can be shared freely between
/// request handlers.
#[derive(Debug, Clone)]
pub struct PaymentGateway {
    keys: Arc<KeyPair>,
    cipher: HybridCipher,
    validator: CardValidator,
    tokens: TransactionTokenGenerator,
    currency: String,
    processing_delay: Duration,
}

impl PaymentGateway {
    pub fn new(keys: Arc<KeyPair>, config: &GatewayConfig) -> Self {
        Self {
            keys,
            cipher: config.hybrid_cipher(),
            validator: config.card_validator(),
            tokens: TransactionTokenGenerator::new(),
            currency: config.currency.clone(),
            processing_delay: config.processing_delay(),
        }
    }

    pub fn with_cipher(mut self, cipher: HybridCipher) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn with_processing_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = delay;
        self
    }

    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    pub fn cipher(&self) -> &HybridCipher {
        &self.cipher
    }

    /// The gateway public key as SPKI PEM
    pub fn public_key_pem(&self) -> Result<String, CryptoError> {
        self.keys.public_key_pem()
    }

    /// Decrypt an inbound envelope and validate the payment inside
    pub fn open_payment(&self, envelope: &Envelope) -> Result<PaymentRecord, GatewayError> {
        let plaintext = self
            .cipher
            .decrypt(envelope, self.keys.private_key())
            .map_err(|e| {
                warn!("Envelope rejected ({}): {}", e.kind(), e);
                e
            })?;
        debug!("Envelope decrypted ({} bytes)", plaintext.len());

        let record = self.validator.validate_json(&plaintext).map_err(|e| {
            info!("Payment failed validation on {}: {}", e.field(), e);
            e
        })?;
        Ok(record)
    }

    /// Issue a token for a validated payment
    pub fn approve(&self, record: &PaymentRecord) -> TransactionResult {
        TransactionResult {
            token: self.tokens.generate(),
            amount: record.amount,
            currency: self.currency.clone(),
            card_last4: card_last4(&record.card_number),
            card_holder: record.card_holder.clone(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            status: TransactionStatus::Approved,
        }
    }

    /// Seal the response for the client using `layout` for the GCM tag
    pub fn seal_response(
        &self,
        transaction: TransactionResult,
        client_key: &RsaPublicKey,
        layout: TagLayout,
    ) -> Result<Envelope, GatewayError> {
        let response = PaymentResponse {
            success: true,
            message: "Payment processed successfully".to_string(),
            transaction,
            security: SecurityInfo {
                encrypted: true,
                algorithm: ENCRYPTION_SCHEME.to_string(),
                timestamp: now_millis(),
            },
        };
        let json = serde_json::to_string(&response)
            .map_err(|e| GatewayError::Serialization(e.to_string()))?;

        Ok(self
            .cipher
            .with_tag_layout(layout)
            .encrypt(&json, client_key)?)
    }

    /// Run a full exchange and return the sealed response
    ///
    /// The reply uses the same tag layout as the inbound envelope, so a
    /// Web Crypto client gets the tag embedded in `encryptedData`.
    pub async fn process_payment(
        &self,
        envelope: &Envelope,
        client_public_key_pem: &str,
    ) -> Result<Envelope, GatewayError> {
        let client_key =
            parse_public_key_pem(client_public_key_pem).map_err(GatewayError::InvalidClientKey)?;

        let record = self.open_payment(envelope)?;
        info!(
            "Processing payment: card {} amount {:.2} {}",
            mask_card_number(&record.card_number),
            record.amount,
            self.currency
        );

        if !self.processing_delay.is_zero() {
            tokio::time::sleep(self.processing_delay).await;
        }

        let transaction = self.approve(&record);
        let token = transaction.token.clone();
        let sealed = self.seal_response(transaction, &client_key, envelope.tag_layout())?;

        info!("Payment approved: {}", token);
        Ok(sealed)
    }
}
