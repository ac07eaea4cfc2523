// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use std::fmt;

use super::validator::mask_card_number;

/// Payment fields as entered by the card holder
///
/// Only exists between decryption and approval. `Debug` masks the card
/// number and hides the CVV.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub card_number: String,
    pub card_holder: String,
    /// `MM/YY` once validated
    pub expiry_date: String,
    pub cvv: String,
    pub amount: f64,
}

impl fmt::Debug for PaymentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentRecord")
            .field("card_number", &mask_card_number(&self.card_number))
            .field("card_holder", &self.card_holder)
            .field("expiry_date", &self.expiry_date)
            .field("cvv", &"***")
            .field("amount", &self.amount)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Approved,
}

/// Outcome of an accepted payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    pub token: String,
    pub amount: f64,
    pub currency: String,
    pub card_last4: String,
    pub card_holder: String,
    /// RFC 3339 with milliseconds, UTC
    pub timestamp: String,
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityInfo {
    pub encrypted: bool,
    pub algorithm: String,
    pub timestamp: i64,
}

/// Plaintext of the encrypted reply sent back to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub success: bool,
    pub message: String,
    pub transaction: TransactionResult,
    pub security: SecurityInfo,
}
