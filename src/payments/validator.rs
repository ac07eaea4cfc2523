// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Card field validation
//!
//! The free functions are pure and total: malformed input yields `false` or a
//! sentinel, never a panic. [`CardValidator`] chains them into the acceptance
//! pipeline run on every decrypted payment:
//!
//! required fields → Luhn → expiry → CVV → amount
//!
//! The pipeline stops at the first failure.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

use super::record::PaymentRecord;

/// Shortest card number accepted by the Luhn check
pub const MIN_CARD_DIGITS: usize = 12;
/// Default upper bound for a single payment
pub const DEFAULT_AMOUNT_CEILING: f64 = 10_000.0;
/// Mask returned when fewer than four digits are available
pub const SHORT_CARD_MASK: &str = "****";

/// Required payment fields, in reporting order
pub const REQUIRED_FIELDS: [&str; 5] = ["cardNumber", "cardHolder", "expiryDate", "cvv", "amount"];

/// Reasons a decrypted payment is refused
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Payment payload is not valid JSON: {reason}")]
    MalformedRecord { reason: String },

    #[error("Missing required fields: {}", .fields.join(", "))]
    MissingFields { fields: Vec<String> },

    #[error("Card number failed the Luhn check")]
    InvalidCardNumber,

    #[error("Invalid expiry date '{normalized}', use MM/YY (for example 12/25)")]
    InvalidExpiry { received: String, normalized: String },

    #[error("CVV must be 3 or 4 digits")]
    InvalidCvv,

    #[error("Amount must be greater than 0 and at most {ceiling:.2}")]
    InvalidAmount { ceiling: f64 },
}

impl ValidationError {
    /// Field the failure refers to
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MalformedRecord { .. } => "payload",
            ValidationError::MissingFields { .. } => "fields",
            ValidationError::InvalidCardNumber => "cardNumber",
            ValidationError::InvalidExpiry { .. } => "expiryDate",
            ValidationError::InvalidCvv => "cvv",
            ValidationError::InvalidAmount { .. } => "amount",
        }
    }

    /// Short headline for the failure
    pub fn title(&self) -> &'static str {
        match self {
            ValidationError::MalformedRecord { .. } => "Invalid payment data",
            ValidationError::MissingFields { .. } => "Missing fields",
            ValidationError::InvalidCardNumber => "Invalid card number",
            ValidationError::InvalidExpiry { .. } => "Invalid expiry date",
            ValidationError::InvalidCvv => "Invalid CVV",
            ValidationError::InvalidAmount { .. } => "Invalid amount",
        }
    }
}

fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Luhn checksum over the digits of `card_number`
///
/// Non-digits are stripped first; fewer than [`MIN_CARD_DIGITS`] digits is
/// invalid.
pub fn luhn_valid(card_number: &str) -> bool {
    let digits = digits_only(card_number);
    if digits.len() < MIN_CARD_DIGITS {
        return false;
    }

    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let digit = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                digit
            }
        })
        .sum();

    sum % 10 == 0
}

/// `"**** **** **** 1234"`, or [`SHORT_CARD_MASK`] for fewer than 4 digits
pub fn mask_card_number(raw: &str) -> String {
    let digits = digits_only(raw);
    if digits.len() < 4 {
        return SHORT_CARD_MASK.to_string();
    }
    format!("**** **** **** {}", &digits[digits.len() - 4..])
}

/// Last four digits of a card number (fewer if the number is shorter)
pub fn card_last4(raw: &str) -> String {
    let digits = digits_only(raw);
    let start = digits.len().saturating_sub(4);
    digits[start..].to_string()
}

/// Reformat `MMYY` or `MMYYYY` input to `MM/YY`
///
/// Any other digit count is returned unchanged, to be rejected by
/// [`expiry_format_valid`].
pub fn normalize_expiry(raw: &str) -> String {
    let digits = digits_only(raw);
    match digits.len() {
        4 => format!("{}/{}", &digits[..2], &digits[2..]),
        6 => format!("{}/{}", &digits[..2], &digits[4..]),
        _ => raw.to_string(),
    }
}

/// `MM/YY` with a month of 01–12
pub fn expiry_format_valid(expiry: &str) -> bool {
    static EXPIRY: OnceLock<Regex> = OnceLock::new();
    EXPIRY
        .get_or_init(|| Regex::new(r"^(0[1-9]|1[0-2])/[0-9]{2}$").expect("static regex"))
        .is_match(expiry)
}

/// Exactly 3 or 4 ASCII digits
pub fn cvv_valid(cvv: &str) -> bool {
    static CVV: OnceLock<Regex> = OnceLock::new();
    CVV.get_or_init(|| Regex::new(r"^[0-9]{3,4}$").expect("static regex"))
        .is_match(cvv)
}

/// Finite and within `(0, ceiling]`
pub fn amount_valid(amount: f64, ceiling: f64) -> bool {
    amount.is_finite() && amount > 0.0 && amount <= ceiling
}

/// Runs the acceptance pipeline over decrypted payment JSON
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardValidator {
    amount_ceiling: f64,
}

impl CardValidator {
    pub fn new(amount_ceiling: f64) -> Self {
        Self { amount_ceiling }
    }

    pub fn amount_ceiling(&self) -> f64 {
        self.amount_ceiling
    }

    /// Parse and validate a decrypted JSON payload
    pub fn validate_json(&self, payload: &str) -> Result<PaymentRecord, ValidationError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| ValidationError::MalformedRecord {
                reason: e.to_string(),
            })?;
        self.validate(&value)
    }

    /// Validate a payment object, returning it with the expiry normalized
    pub fn validate(&self, payment: &Value) -> Result<PaymentRecord, ValidationError> {
        let fields = payment
            .as_object()
            .ok_or_else(|| ValidationError::MalformedRecord {
                reason: "expected a JSON object".to_string(),
            })?;

        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|name| !is_present(fields.get(**name)))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields { fields: missing });
        }

        // Fractional numbers have no text form and read as empty.
        let text = |name: &str| fields.get(name).and_then(as_text).unwrap_or_default();

        let card_number = text("cardNumber");
        if !luhn_valid(&card_number) {
            return Err(ValidationError::InvalidCardNumber);
        }

        let received_expiry = text("expiryDate");
        let expiry_date = normalize_expiry(&received_expiry);
        if !expiry_format_valid(&expiry_date) {
            return Err(ValidationError::InvalidExpiry {
                received: received_expiry,
                normalized: expiry_date,
            });
        }

        let cvv = text("cvv");
        if !cvv_valid(&cvv) {
            return Err(ValidationError::InvalidCvv);
        }

        let amount = fields.get("amount").map(as_amount).unwrap_or(f64::NAN);
        if !amount_valid(amount, self.amount_ceiling) {
            return Err(ValidationError::InvalidAmount {
                ceiling: self.amount_ceiling,
            });
        }

        Ok(PaymentRecord {
            card_number,
            card_holder: text("cardHolder").trim().to_string(),
            expiry_date,
            cvv,
            amount,
        })
    }
}

impl Default for CardValidator {
    fn default() -> Self {
        Self::new(DEFAULT_AMOUNT_CEILING)
    }
}

/// Strings must be non-blank, numbers non-zero; anything else is missing
fn is_present(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(true),
        _ => false,
    }
}

/// Strings as-is, integers in decimal; floats would leak `.0` into digit checks
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => n
            .as_u64()
            .map(|v| v.to_string())
            .or_else(|| n.as_i64().map(|v| v.to_string())),
        _ => None,
    }
}

fn as_amount(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}
