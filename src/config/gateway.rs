// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Gateway configuration
//!
//! Every tunable of the gateway lives here: the envelope freshness window,
//! the amount ceiling, CORS origin and both rate-limit policies. Values come
//! from defaults, an optional TOML file (`GATEWAY_CONFIG`) and `GATEWAY_*`
//! environment variables, in that order.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::crypto::{HybridCipher, KeyPairProvider, MIN_MODULUS_BITS};
use crate::payments::CardValidator;

/// Fixed-window request budget per client IP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl RateLimitPolicy {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub listen_addr: String,
    /// Oldest envelope accepted
    pub max_envelope_age_ms: u64,
    /// How far in the future an envelope may be stamped
    pub clock_skew_tolerance_ms: u64,
    pub amount_ceiling: f64,
    pub currency: String,
    pub rsa_modulus_bits: usize,
    /// `*` or a single origin
    pub cors_allowed_origin: String,
    /// Applies to every route
    pub general_rate_limit: RateLimitPolicy,
    /// Applies to the payment route on top of the general limit
    pub payment_rate_limit: RateLimitPolicy,
    pub max_body_bytes: usize,
    /// Simulated approval latency
    pub processing_delay_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3001".to_string(),
            max_envelope_age_ms: 300_000,
            clock_skew_tolerance_ms: 30_000,
            amount_ceiling: 10_000.0,
            currency: "MXN".to_string(),
            rsa_modulus_bits: 2048,
            cors_allowed_origin: "*".to_string(),
            general_rate_limit: RateLimitPolicy {
                max_requests: 100,
                window_secs: 15 * 60,
            },
            payment_rate_limit: RateLimitPolicy {
                max_requests: 50,
                window_secs: 15 * 60,
            },
            max_body_bytes: 10 * 1024,
            processing_delay_ms: 1000,
        }
    }
}

impl GatewayConfig {
    /// Defaults, then `GATEWAY_CONFIG` file if set, then environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = match env::var("GATEWAY_CONFIG") {
            Ok(path) => Self::from_toml_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| env::var(name).ok());
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid gateway configuration: {}", e))?;
        Ok(config)
    }

    /// Defaults with environment overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|name| env::var(name).ok());
        config
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse gateway config TOML")
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Override fields from `GATEWAY_*` variables resolved by `lookup`
    ///
    /// Unparsable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
            lookup(name).and_then(|v| v.trim().parse().ok())
        }

        if let Some(v) = lookup("GATEWAY_LISTEN_ADDR") {
            self.listen_addr = v;
        }
        if let Some(v) = parsed(&lookup, "GATEWAY_MAX_ENVELOPE_AGE_MS") {
            self.max_envelope_age_ms = v;
        }
        if let Some(v) = parsed(&lookup, "GATEWAY_CLOCK_SKEW_MS") {
            self.clock_skew_tolerance_ms = v;
        }
        if let Some(v) = parsed(&lookup, "GATEWAY_AMOUNT_CEILING") {
            self.amount_ceiling = v;
        }
        if let Some(v) = lookup("GATEWAY_CURRENCY") {
            self.currency = v;
        }
        if let Some(v) = parsed(&lookup, "GATEWAY_RSA_BITS") {
            self.rsa_modulus_bits = v;
        }
        if let Some(v) = lookup("GATEWAY_CORS_ORIGIN") {
            self.cors_allowed_origin = v;
        }
        if let Some(v) = parsed(&lookup, "GATEWAY_RATE_LIMIT_MAX") {
            self.general_rate_limit.max_requests = v;
        }
        if let Some(v) = parsed(&lookup, "GATEWAY_RATE_LIMIT_WINDOW_SECS") {
            self.general_rate_limit.window_secs = v;
        }
        if let Some(v) = parsed(&lookup, "GATEWAY_PAYMENT_RATE_LIMIT_MAX") {
            self.payment_rate_limit.max_requests = v;
        }
        if let Some(v) = parsed(&lookup, "GATEWAY_PAYMENT_RATE_LIMIT_WINDOW_SECS") {
            self.payment_rate_limit.window_secs = v;
        }
        if let Some(v) = parsed(&lookup, "GATEWAY_MAX_BODY_BYTES") {
            self.max_body_bytes = v;
        }
        if let Some(v) = parsed(&lookup, "GATEWAY_PROCESSING_DELAY_MS") {
            self.processing_delay_ms = v;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_envelope_age_ms == 0 {
            return Err("Envelope freshness window must be greater than 0".to_string());
        }
        let max_ms = i64::MAX as u64;
        if self.max_envelope_age_ms > max_ms || self.clock_skew_tolerance_ms > max_ms {
            return Err(format!(
                "Envelope freshness window and clock skew must not exceed {} ms",
                max_ms
            ));
        }
        if !(self.amount_ceiling.is_finite() && self.amount_ceiling > 0.0) {
            return Err("Amount ceiling must be a positive number".to_string());
        }
        if self.rsa_modulus_bits < MIN_MODULUS_BITS {
            return Err(format!(
                "RSA modulus must be at least {} bits, got {}",
                MIN_MODULUS_BITS, self.rsa_modulus_bits
            ));
        }
        for (name, policy) in [
            ("general", &self.general_rate_limit),
            ("payment", &self.payment_rate_limit),
        ] {
            if policy.max_requests == 0 || policy.window_secs == 0 {
                return Err(format!(
                    "The {} rate limit needs a non-zero request count and window",
                    name
                ));
            }
        }
        if self.currency.trim().is_empty() {
            return Err("Currency must not be empty".to_string());
        }
        Ok(())
    }

    pub fn max_envelope_age(&self) -> Duration {
        Duration::from_millis(self.max_envelope_age_ms)
    }

    pub fn clock_skew_tolerance(&self) -> Duration {
        Duration::from_millis(self.clock_skew_tolerance_ms)
    }

    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }

    pub fn hybrid_cipher(&self) -> HybridCipher {
        HybridCipher::new(self.max_envelope_age(), self.clock_skew_tolerance())
    }

    pub fn card_validator(&self) -> CardValidator {
        CardValidator::new(self.amount_ceiling)
    }

    pub fn key_pair_provider(&self) -> KeyPairProvider {
        KeyPairProvider::new(self.rsa_modulus_bits)
    }
}
