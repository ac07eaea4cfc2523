// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::crypto::CryptoError;
use crate::payments::{GatewayError, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    PayloadTooLarge {
        limit: usize,
    },
    /// `encryptedPayment` or `clientPublicKey` absent
    MissingPayload {
        has_encrypted_payment: bool,
        has_client_public_key: bool,
    },
    InvalidClientKey,
    /// Any envelope failure; the kind is logged, never returned
    DecryptionFailed,
    Validation(ValidationError),
    RateLimitExceeded {
        retry_after: u64,
    },
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let (error, message, details) = match self {
            ApiError::NotFound(msg) => ("Not found", msg.clone(), None),
            ApiError::InvalidRequest(msg) => ("Invalid request", msg.clone(), None),
            ApiError::PayloadTooLarge { limit } => (
                "Payload too large",
                format!("Request body exceeds {} bytes", limit),
                None,
            ),
            ApiError::MissingPayload {
                has_encrypted_payment,
                has_client_public_key,
            } => {
                let mut details = HashMap::new();
                details.insert(
                    "received".to_string(),
                    serde_json::json!({
                        "encryptedPayment": has_encrypted_payment,
                        "clientPublicKey": has_client_public_key,
                    }),
                );
                (
                    "Incomplete data",
                    "encryptedPayment and clientPublicKey are required".to_string(),
                    Some(details),
                )
            }
            ApiError::InvalidClientKey => (
                "Invalid public key",
                "clientPublicKey must be an RSA-2048 or larger SPKI PEM key".to_string(),
                None,
            ),
            ApiError::DecryptionFailed => (
                "Decryption error",
                "Unable to decrypt payment payload".to_string(),
                None,
            ),
            ApiError::Validation(err) => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(err.field().to_string()),
                );
                match err {
                    ValidationError::MissingFields { fields } => {
                        details.insert("fields".to_string(), serde_json::json!(fields));
                    }
                    ValidationError::InvalidExpiry {
                        received,
                        normalized,
                    } => {
                        details.insert("received".to_string(), serde_json::json!(received));
                        details.insert("normalized".to_string(), serde_json::json!(normalized));
                    }
                    _ => {}
                }
                (err.title(), err.to_string(), Some(details))
            }
            ApiError::RateLimitExceeded { retry_after } => {
                let mut details = HashMap::new();
                details.insert(
                    "retry_after".to_string(),
                    serde_json::Value::Number((*retry_after).into()),
                );
                (
                    "Rate limit exceeded",
                    "Too many requests, try again later".to_string(),
                    Some(details),
                )
            }
            ApiError::InternalError(msg) => ("Internal server error", msg.clone(), None),
        };

        ErrorResponse {
            error: error.to_string(),
            message,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::PayloadTooLarge { .. } => 413,
            ApiError::InvalidRequest(_)
            | ApiError::MissingPayload { .. }
            | ApiError::InvalidClientKey
            | ApiError::DecryptionFailed
            | ApiError::Validation(_) => 400,
            ApiError::RateLimitExceeded { .. } => 429,
            ApiError::InternalError(_) => 500,
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidClientKey(_) => ApiError::InvalidClientKey,
            // Failures sealing the reply are on our side.
            GatewayError::Crypto(
                e @ (CryptoError::Encryption { .. } | CryptoError::KeyGeneration { .. }),
            ) => ApiError::InternalError(e.public_message().to_string()),
            GatewayError::Crypto(_) => ApiError::DecryptionFailed,
            GatewayError::Validation(e) => ApiError::Validation(e),
            GatewayError::Serialization(_) => {
                ApiError::InternalError("Error processing the transaction".to_string())
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::PayloadTooLarge { limit } => {
                write!(f, "Request body exceeds {} bytes", limit)
            }
            ApiError::MissingPayload { .. } => write!(f, "Incomplete payment request"),
            ApiError::InvalidClientKey => write!(f, "Invalid client public key"),
            ApiError::DecryptionFailed => write!(f, "Unable to decrypt payment payload"),
            ApiError::Validation(err) => write!(f, "Validation error: {}", err),
            ApiError::RateLimitExceeded { retry_after } => write!(
                f,
                "Rate limit exceeded, retry after {} seconds",
                retry_after
            ),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}
