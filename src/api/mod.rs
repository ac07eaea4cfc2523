// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod rate_limit;

pub use errors::{ApiError, ErrorResponse};
pub use handlers::{
    EncryptedResponse, HealthResponse, ProcessPaymentRequest, PublicKeyResponse, StatusResponse,
};
pub use http_server::{build_router, start_server, AppState};
pub use rate_limit::IpRateLimiter;
