// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use secure_payment_gateway::{
    api::start_server, config::GatewayConfig, payments::PaymentGateway, version,
};
use std::{env, sync::Arc};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting {}...", version::get_version_string());

    let config = GatewayConfig::load()?;
    info!(
        "Envelope window {} ms (skew {} ms), amount ceiling {:.2} {}",
        config.max_envelope_age_ms,
        config.clock_skew_tolerance_ms,
        config.amount_ceiling,
        config.currency
    );

    println!("🔑 Generating {}-bit RSA key pair...", config.rsa_modulus_bits);
    let keys = config
        .key_pair_provider()
        .generate()
        .context("Failed to generate gateway key pair")?;
    println!("✅ Key pair ready");

    let gateway = PaymentGateway::new(Arc::new(keys), &config);
    start_server(gateway, &config).await
}
