// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Transaction token generation

use rand::{rngs::OsRng, RngCore};

/// Default token prefix
pub const TOKEN_PREFIX: &str = "TXN_";
/// Random bytes per token (128 bits)
pub const TOKEN_RANDOM_BYTES: usize = 16;

/// Issues opaque transaction identifiers: prefix + 32 uppercase hex chars
#[derive(Debug, Clone)]
pub struct TransactionTokenGenerator {
    prefix: String,
}

impl TransactionTokenGenerator {
    pub fn new() -> Self {
        Self::with_prefix(TOKEN_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn generate(&self) -> String {
        let mut bytes = [0u8; TOKEN_RANDOM_BYTES];
        OsRng.fill_bytes(&mut bytes);
        format!("{}{}", self.prefix, hex::encode_upper(bytes))
    }

    /// Check that `token` has this generator's shape
    pub fn is_well_formed(&self, token: &str) -> bool {
        token
            .strip_prefix(self.prefix.as_str())
            .map(|hex_part| {
                hex_part.len() == TOKEN_RANDOM_BYTES * 2
                    && hex_part
                        .chars()
                        .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
            })
            .unwrap_or(false)
    }
}

impl Default for TransactionTokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}
