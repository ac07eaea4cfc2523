// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::crypto::Envelope;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub message: String,
    pub status: String,
    pub encryption: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub public_key: String,
    pub message: String,
    pub timestamp: i64,
}

/// Body of `POST /api/process-payment`
///
/// Both fields are optional at the serde level so a missing one can be
/// reported explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentRequest {
    #[serde(default)]
    pub encrypted_payment: Option<Envelope>,
    #[serde(default)]
    pub client_public_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedResponse {
    pub encrypted: bool,
    pub data: Envelope,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub encryption: String,
    pub timestamp: i64,
    /// Seconds since startup
    pub uptime: f64,
}
