// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::{net::SocketAddr, sync::Arc, time::Instant};
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, warn, Instrument};

use super::handlers::{
    EncryptedResponse, HealthResponse, ProcessPaymentRequest, PublicKeyResponse, StatusResponse,
};
use super::rate_limit::{enforce_rate_limit, IpRateLimiter};
use super::ApiError;
use crate::config::GatewayConfig;
use crate::crypto::now_millis;
use crate::payments::{PaymentGateway, ENCRYPTION_SCHEME};

const SERVICE_NAME: &str = "Secure Payment Gateway";

#[derive(Clone)]
pub struct AppState {
    gateway: Arc<PaymentGateway>,
    public_key_pem: Arc<str>,
    started_at: Instant,
    max_body_bytes: usize,
}

impl AppState {
    /// Exports the gateway public key once; every request serves the same PEM.
    pub fn new(gateway: PaymentGateway, max_body_bytes: usize) -> Result<Self> {
        let public_key_pem = gateway
            .public_key_pem()
            .context("Failed to export gateway public key")?;

        Ok(Self {
            gateway: Arc::new(gateway),
            public_key_pem: Arc::from(public_key_pem),
            started_at: Instant::now(),
            max_body_bytes,
        })
    }
}

pub fn build_router(gateway: PaymentGateway, config: &GatewayConfig) -> Result<Router> {
    let state = AppState::new(gateway, config.max_body_bytes)?;
    let general_limiter = Arc::new(IpRateLimiter::new(config.general_rate_limit));
    let payment_limiter = Arc::new(IpRateLimiter::new(config.payment_rate_limit));

    let app = Router::new()
        .route("/", get(status_handler))
        .route("/api/public-key", get(public_key_handler))
        .route(
            "/api/process-payment",
            post(process_payment_handler).route_layer(middleware::from_fn_with_state(
                payment_limiter,
                enforce_rate_limit,
            )),
        )
        .route("/api/health", get(health_handler))
        .fallback(not_found_handler)
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            general_limiter,
            enforce_rate_limit,
        ))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors_layer(&config.cors_allowed_origin)?)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

fn cors_layer(allowed_origin: &str) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    // Credentials cannot be combined with a wildcard origin.
    if allowed_origin == "*" {
        return Ok(cors.allow_origin(Any));
    }
    let origin = HeaderValue::from_str(allowed_origin)
        .with_context(|| format!("Invalid CORS origin: {}", allowed_origin))?;
    Ok(cors.allow_origin(origin).allow_credentials(true))
}

pub async fn start_server(gateway: PaymentGateway, config: &GatewayConfig) -> Result<()> {
    let app = build_router(gateway, config)?;

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Payment gateway listening on {}", addr);
    info!("Encryption: {}", ENCRYPTION_SCHEME);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;

    info!("Payment gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn status_handler() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: format!("{} with End-to-End Encryption", SERVICE_NAME),
        status: "online".to_string(),
        encryption: ENCRYPTION_SCHEME.to_string(),
        version: crate::version::VERSION_NUMBER.to_string(),
    })
}

async fn public_key_handler(State(state): State<AppState>) -> Json<PublicKeyResponse> {
    Json(PublicKeyResponse {
        public_key: state.public_key_pem.to_string(),
        message: "Use this key to encrypt payment data".to_string(),
        timestamp: now_millis(),
    })
}

async fn process_payment_handler(
    State(state): State<AppState>,
    payload: Result<Json<ProcessPaymentRequest>, JsonRejection>,
) -> Result<Json<EncryptedResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge {
                limit: state.max_body_bytes,
            }
        } else {
            ApiError::InvalidRequest(e.body_text())
        }
    })?;

    let client_key = request
        .client_public_key
        .filter(|key| !key.trim().is_empty());
    let (envelope, client_key) = match (request.encrypted_payment, client_key) {
        (Some(envelope), Some(key)) => (envelope, key),
        (envelope, key) => {
            return Err(ApiError::MissingPayload {
                has_encrypted_payment: envelope.is_some(),
                has_client_public_key: key.is_some(),
            })
        }
    };

    let request_id = uuid::Uuid::new_v4();
    let sealed = state
        .gateway
        .process_payment(&envelope, &client_key)
        .instrument(info_span!("payment", %request_id))
        .await?;

    Ok(Json(EncryptedResponse {
        encrypted: true,
        data: sealed,
        message: "Encrypted response".to_string(),
    }))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        service: SERVICE_NAME.to_string(),
        encryption: ENCRYPTION_SCHEME.to_string(),
        timestamp: now_millis(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

async fn not_found_handler() -> ApiError {
    ApiError::NotFound("Endpoint not found".to_string())
}
