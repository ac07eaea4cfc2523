// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod crypto;
pub mod payments;
pub mod version;

pub use api::{build_router, start_server, ApiError};
pub use client::PaymentClient;
pub use config::GatewayConfig;
pub use crypto::{CryptoError, Envelope, HybridCipher, KeyPair, KeyPairProvider};
pub use payments::{CardValidator, PaymentGateway, PaymentRecord, ValidationError};
