// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-client-IP rate limiting

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter as GovRateLimiter};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::ApiError;
use crate::config::RateLimitPolicy;

/// Key used when the peer address is unknown (in-process tests)
const UNKNOWN_CLIENT: &str = "unknown";

/// Idle client entries are dropped every this many checks
const PRUNE_EVERY: u64 = 1024;

/// Allows `max_requests` per window per client, refilling evenly
pub struct IpRateLimiter {
    limiter: GovRateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>,
    policy: RateLimitPolicy,
    checks: AtomicU64,
}

impl IpRateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        let burst = NonZeroU32::new(policy.max_requests).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(policy.window() / burst.get())
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: GovRateLimiter::keyed(quota),
            policy,
            checks: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Number of clients currently holding limiter state
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    /// Forget clients whose budget has fully refilled
    pub fn prune(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        debug!(
            "Rate limiter pruned {} idle clients",
            before.saturating_sub(self.limiter.len())
        );
    }

    /// Count one request from `client`
    pub fn check(&self, client: &str) -> Result<(), ApiError> {
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune();
        }

        self.limiter
            .check_key(&client.to_string())
            .map_err(|_| ApiError::RateLimitExceeded {
                retry_after: self.policy.window_secs,
            })
    }
}

/// Middleware rejecting requests over the limiter's budget with 429
pub async fn enforce_rate_limit(
    State(limiter): State<Arc<IpRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

    match limiter.check(&client) {
        Ok(()) => next.run(request).await,
        Err(err) => {
            warn!("Rate limit exceeded for {} on {}", client, request.uri().path());
            err.into_response()
        }
    }
}
