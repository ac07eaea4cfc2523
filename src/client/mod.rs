// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Payment Client
//!
//! Counterpart of the gateway: holds its own key pair, encrypts payments for
//! the gateway key and opens the sealed reply.

use anyhow::{anyhow, bail, Context, Result};
use rsa::RsaPublicKey;
use std::time::Duration;
use tracing::{debug, info};

use crate::api::{EncryptedResponse, ErrorResponse, ProcessPaymentRequest, PublicKeyResponse};
use crate::crypto::{
    parse_public_key_pem, Envelope, HybridCipher, KeyPair, KeyPairProvider,
};
use crate::payments::{PaymentRecord, PaymentResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PaymentClient {
    http: reqwest::Client,
    base_url: String,
    keys: KeyPair,
    cipher: HybridCipher,
    server_key: Option<RsaPublicKey>,
}

impl PaymentClient {
    pub fn new(base_url: impl Into<String>, keys: KeyPair) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            keys,
            cipher: HybridCipher::default(),
            server_key: None,
        })
    }

    /// Client with a freshly generated RSA-2048 key pair
    pub fn generate(base_url: impl Into<String>) -> Result<Self> {
        let keys = KeyPairProvider::default()
            .generate()
            .context("Failed to generate client key pair")?;
        Self::new(base_url, keys)
    }

    pub fn with_cipher(mut self, cipher: HybridCipher) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn public_key_pem(&self) -> Result<String> {
        Ok(self.keys.public_key_pem()?)
    }

    pub fn set_server_key(&mut self, key: RsaPublicKey) {
        self.server_key = Some(key);
    }

    pub fn server_key(&self) -> Option<&RsaPublicKey> {
        self.server_key.as_ref()
    }

    /// `GET /api/public-key`; the key is cached for later payments
    pub async fn fetch_server_key(&mut self) -> Result<&RsaPublicKey> {
        let url = format!("{}/api/public-key", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;
        if !response.status().is_success() {
            bail!("Gateway returned {} for {}", response.status(), url);
        }

        let body: PublicKeyResponse = response
            .json()
            .await
            .context("Invalid public key response")?;
        let key = parse_public_key_pem(&body.public_key)
            .context("Gateway published an unusable public key")?;
        info!("Fetched gateway public key from {}", self.base_url);

        let key = self.server_key.insert(key);
        Ok(&*key)
    }

    pub fn encrypt_payment(&self, payment: &PaymentRecord) -> Result<Envelope> {
        let server_key = self
            .server_key
            .as_ref()
            .ok_or_else(|| anyhow!("Gateway public key not loaded"))?;
        let json = serde_json::to_string(payment).context("Failed to serialize payment")?;
        Ok(self.cipher.encrypt(&json, server_key)?)
    }

    pub fn decrypt_response(&self, envelope: &Envelope) -> Result<PaymentResponse> {
        let plaintext = self
            .cipher
            .decrypt(envelope, self.keys.private_key())
            .context("Failed to open gateway response")?;
        serde_json::from_str(&plaintext).context("Gateway response is not a payment response")
    }

    /// Encrypt, submit and open the reply; fetches the gateway key if needed
    pub async fn submit_payment(&mut self, payment: &PaymentRecord) -> Result<PaymentResponse> {
        if self.server_key.is_none() {
            self.fetch_server_key().await?;
        }

        let request = ProcessPaymentRequest {
            encrypted_payment: Some(self.encrypt_payment(payment)?),
            client_public_key: Some(self.public_key_pem()?),
        };
        let url = format!("{}/api/process-payment", self.base_url);
        debug!("Submitting encrypted payment to {}", url);

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let error: ErrorResponse = response
                .json()
                .await
                .with_context(|| format!("Gateway returned {}", status))?;
            bail!("{} ({}): {}", error.error, status.as_u16(), error.message);
        }

        let body: EncryptedResponse = response
            .json()
            .await
            .context("Invalid encrypted response")?;
        self.decrypt_response(&body.data)
    }
}
