// Version information for the secure payment gateway

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-hybrid-envelopes-2025-10-13";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2025-10-13";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "rsa-oaep-sha256",
    "aes-256-gcm",
    "web-crypto-envelopes",
    "envelope-freshness",
    "luhn-validation",
    "rate-limiting",
    "encrypted-responses",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Secure Payment Gateway {} ({})", VERSION_NUMBER, BUILD_DATE)
}
