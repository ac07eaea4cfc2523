// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod gateway;
pub mod record;
pub mod validator;

pub use gateway::{GatewayError, PaymentGateway, ENCRYPTION_SCHEME};
pub use record::{
    PaymentRecord, PaymentResponse, SecurityInfo, TransactionResult, TransactionStatus,
};
pub use validator::{
    amount_valid, card_last4, cvv_valid, expiry_format_valid, luhn_valid, mask_card_number,
    normalize_expiry, CardValidator, ValidationError, DEFAULT_AMOUNT_CEILING,
};
