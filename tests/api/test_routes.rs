// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// HTTP route tests driven through the router without a socket

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use secure_payment_gateway::api::{build_router, EncryptedResponse, ErrorResponse, PublicKeyResponse};
use secure_payment_gateway::config::{GatewayConfig, RateLimitPolicy};
use secure_payment_gateway::crypto::{parse_public_key_pem, HybridCipher, KeyPair, KeyPairProvider};
use secure_payment_gateway::payments::{PaymentGateway, PaymentResponse};
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tower::ServiceExt;

fn gateway_keys() -> Arc<KeyPair> {
    static KEYS: OnceLock<Arc<KeyPair>> = OnceLock::new();
    KEYS.get_or_init(|| Arc::new(KeyPairProvider::default().generate().unwrap()))
        .clone()
}

fn client_keys() -> &'static KeyPair {
    static KEYS: OnceLock<KeyPair> = OnceLock::new();
    KEYS.get_or_init(|| KeyPairProvider::default().generate().unwrap())
}

fn router_with(config: GatewayConfig) -> Router {
    let gateway =
        PaymentGateway::new(gateway_keys(), &config).with_processing_delay(Duration::ZERO);
    build_router(gateway, &config).unwrap()
}

fn router() -> Router {
    router_with(GatewayConfig::default())
}

fn payment_body(payment: Value) -> Value {
    let envelope = HybridCipher::default()
        .encrypt(&payment.to_string(), gateway_keys().public_key())
        .unwrap();
    json!({
        "encryptedPayment": envelope,
        "clientPublicKey": client_keys().public_key_pem().unwrap(),
    })
}

fn valid_payment() -> Value {
    json!({
        "cardNumber": "4532015112830366",
        "cardHolder": "Ana Torres",
        "expiryDate": "12/27",
        "cvv": "123",
        "amount": 99.99
    })
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[cfg(test)]
mod route_tests {
    use super::*;

    #[tokio::test]
    async fn test_status_route() {
        let response = router().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = body_json(response).await;
        assert_eq!(body["status"], "online");
        assert_eq!(body["encryption"], "RSA-2048 + AES-256-GCM");
    }

    #[tokio::test]
    async fn test_public_key_route() {
        let response = router().oneshot(get("/api/public-key")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
            "nosniff"
        );

        let body: PublicKeyResponse = body_json(response).await;
        let key = parse_public_key_pem(&body.public_key).unwrap();
        assert_eq!(&key, gateway_keys().public_key());
        assert!(body.timestamp > 0);
    }

    #[tokio::test]
    async fn test_public_key_is_stable() {
        let app = router();
        let first: PublicKeyResponse =
            body_json(app.clone().oneshot(get("/api/public-key")).await.unwrap()).await;
        let second: PublicKeyResponse =
            body_json(app.oneshot(get("/api/public-key")).await.unwrap()).await;
        assert_eq!(first.public_key, second.public_key);
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = router().oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = body_json(response).await;
        assert_eq!(body["status"], "OK");
        assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn test_process_payment_success() {
        let request = post_json("/api/process-payment", &payment_body(valid_payment()));
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: EncryptedResponse = body_json(response).await;
        assert!(body.encrypted);

        let reply = HybridCipher::default()
            .decrypt(&body.data, client_keys().private_key())
            .unwrap();
        let payment: PaymentResponse = serde_json::from_str(&reply).unwrap();
        assert!(payment.success);
        assert_eq!(payment.transaction.amount, 99.99);
        assert_eq!(payment.transaction.card_last4, "0366");
    }

    #[tokio::test]
    async fn test_missing_client_key() {
        let mut body = payment_body(valid_payment());
        body.as_object_mut().unwrap().remove("clientPublicKey");

        let response = router()
            .oneshot(post_json("/api/process-payment", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: ErrorResponse = body_json(response).await;
        assert_eq!(error.error, "Incomplete data");
        let received = &error.details.unwrap()["received"];
        assert_eq!(received["encryptedPayment"], true);
        assert_eq!(received["clientPublicKey"], false);
    }

    #[tokio::test]
    async fn test_invalid_client_key() {
        let mut body = payment_body(valid_payment());
        body["clientPublicKey"] = json!("-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----");

        let response = router()
            .oneshot(post_json("/api/process-payment", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: ErrorResponse = body_json(response).await;
        assert_eq!(error.error, "Invalid public key");
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/process-payment")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = body_json(response).await;
        assert_eq!(error.error, "Invalid request");
    }

    #[tokio::test]
    async fn test_validation_failure_is_reported() {
        let mut payment = valid_payment();
        payment["cardNumber"] = json!("4532015112830367");

        let response = router()
            .oneshot(post_json("/api/process-payment", &payment_body(payment)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: ErrorResponse = body_json(response).await;
        assert_eq!(error.error, "Invalid card number");
        assert_eq!(error.details.unwrap()["field"], "cardNumber");
    }

    #[tokio::test]
    async fn test_tampered_envelope_gets_generic_error() {
        let mut body = payment_body(valid_payment());
        body["encryptedPayment"]["authTag"] = json!("AAAAAAAAAAAAAAAAAAAAAA==");

        let response = router()
            .oneshot(post_json("/api/process-payment", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: ErrorResponse = body_json(response).await;
        assert_eq!(error.message, "Unable to decrypt payment payload");
        assert!(error.details.is_none());
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = router().oneshot(get("/api/unknown")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let error: ErrorResponse = body_json(response).await;
        assert_eq!(error.error, "Not found");
    }

    #[tokio::test]
    async fn test_payment_rate_limit() {
        let config = GatewayConfig {
            payment_rate_limit: RateLimitPolicy {
                max_requests: 2,
                window_secs: 900,
            },
            ..GatewayConfig::default()
        };
        let app = router_with(config);
        let body = json!({});

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post_json("/api/process-payment", &body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let response = app
            .clone()
            .oneshot(post_json("/api/process-payment", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let error: ErrorResponse = body_json(response).await;
        assert_eq!(error.details.unwrap()["retry_after"], 900);

        // Other routes still have budget.
        let response = app.oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let config = GatewayConfig {
            max_body_bytes: 64,
            ..GatewayConfig::default()
        };
        let body = json!({ "padding": "x".repeat(200) });

        let response = router_with(config)
            .oneshot(post_json("/api/process-payment", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/process-payment")
            .header(header::ORIGIN, "https://shop.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = router().oneshot(request).await.unwrap();
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }
}
