// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::client::PaymentClient;
use crate::crypto::{KeyPairProvider, TransactionTokenGenerator, MIN_MODULUS_BITS};
use crate::payments::{mask_card_number, CardValidator, PaymentRecord, DEFAULT_AMOUNT_CEILING};

/// Arguments for keygen command
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Modulus size in bits (minimum 2048)
    #[arg(long, default_value_t = MIN_MODULUS_BITS)]
    pub bits: usize,

    /// Directory to write public.pem and private.pem into (prints to stdout if absent)
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

/// Arguments for check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Payment record as JSON
    #[arg(long, conflicts_with = "file")]
    pub json: Option<String>,

    /// File containing the payment record JSON
    #[arg(long, conflicts_with = "json")]
    pub file: Option<PathBuf>,

    /// Largest accepted amount
    #[arg(long, default_value_t = DEFAULT_AMOUNT_CEILING)]
    pub amount_ceiling: f64,
}

/// Arguments for token command
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Number of tokens to generate
    #[arg(long, default_value_t = 1)]
    pub count: usize,
}

/// Arguments for pay command
#[derive(Args, Debug)]
pub struct PayArgs {
    /// Gateway base URL
    #[arg(long, env = "GATEWAY_URL", default_value = "http://127.0.0.1:3001")]
    pub url: String,

    #[arg(long)]
    pub card_number: String,

    #[arg(long)]
    pub card_holder: String,

    /// MM/YY (MMYY and MM/YYYY are normalized)
    #[arg(long)]
    pub expiry: String,

    #[arg(long)]
    pub cvv: String,

    #[arg(long)]
    pub amount: f64,
}

pub fn keygen(args: KeygenArgs) -> Result<()> {
    let keys = KeyPairProvider::new(args.bits)
        .generate()
        .context("Key generation failed")?;
    let public_pem = keys.public_key_pem()?;
    let private_pem = keys.private_key_pem()?;

    match args.out_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let public_path = dir.join("public.pem");
            let private_path = dir.join("private.pem");
            std::fs::write(&public_path, public_pem.as_bytes())
                .with_context(|| format!("Failed to write {}", public_path.display()))?;
            write_private_file(&private_path, private_pem.as_bytes())
                .with_context(|| format!("Failed to write {}", private_path.display()))?;
            info!("Wrote {}-bit key pair to {}", keys.modulus_bits(), dir.display());
            println!("✅ Public key:  {}", public_path.display());
            println!("✅ Private key: {}", private_path.display());
        }
        None => {
            println!("{}", public_pem);
            println!("{}", private_pem.as_str());
        }
    }
    Ok(())
}

/// Owner read/write only on Unix
fn write_private_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    // An existing file keeps its old mode through open().
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)
}

pub fn check(args: CheckArgs) -> Result<()> {
    let payload = match (args.json, args.file) {
        (Some(json), _) => json,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => return Err(anyhow!("Provide --json or --file")),
    };

    let record = CardValidator::new(args.amount_ceiling)
        .validate_json(&payload)
        .map_err(|e| anyhow!("{} ({}): {}", e.title(), e.field(), e))?;

    println!("✅ Payment record is valid");
    println!("   Card:   {}", mask_card_number(&record.card_number));
    println!("   Holder: {}", record.card_holder);
    println!("   Expiry: {}", record.expiry_date);
    println!("   Amount: {:.2}", record.amount);
    Ok(())
}

pub fn token(args: TokenArgs) -> Result<()> {
    let generator = TransactionTokenGenerator::new();
    for _ in 0..args.count {
        println!("{}", generator.generate());
    }
    Ok(())
}

pub async fn pay(args: PayArgs) -> Result<()> {
    let payment = PaymentRecord {
        card_number: args.card_number,
        card_holder: args.card_holder,
        expiry_date: args.expiry,
        cvv: args.cvv,
        amount: args.amount,
    };

    let mut client = PaymentClient::generate(args.url)?;
    let response = client.submit_payment(&payment).await?;
    let transaction = &response.transaction;

    println!("✅ {}", response.message);
    println!("   Token:    {}", transaction.token);
    println!("   Amount:   {:.2} {}", transaction.amount, transaction.currency);
    println!("   Card:     **** {}", transaction.card_last4);
    println!("   Holder:   {}", transaction.card_holder);
    println!("   Time:     {}", transaction.timestamp);
    println!("   Security: {}", response.security.algorithm);
    Ok(())
}
