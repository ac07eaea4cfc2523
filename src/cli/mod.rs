// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Secure payment gateway CLI
#[derive(Parser, Debug)]
#[command(name = "securepay-cli")]
#[command(version)]
#[command(about = "Key, validation and payment tools for the secure payment gateway", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate an RSA key pair as PEM
    Keygen(commands::KeygenArgs),

    /// Validate a payment record locally
    Check(commands::CheckArgs),

    /// Generate transaction tokens
    Token(commands::TokenArgs),

    /// Encrypt and submit a payment to a running gateway
    Pay(commands::PayArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Keygen(args) => commands::keygen(args),
        Commands::Check(args) => commands::check(args),
        Commands::Token(args) => commands::token(args),
        Commands::Pay(args) => commands::pay(args).await,
    }
}
