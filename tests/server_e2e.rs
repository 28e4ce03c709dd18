//! End-to-end validation server tests
//!
//! Spins the router up on a real socket and exercises it with reqwest.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use fhevm_kit::server::{create_router, create_shared_state, ServerConfig, SharedState};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;

static PORT_COUNTER: AtomicU16 = AtomicU16::new(19500);

fn next_port() -> u16 {
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Test harness for running server tests
pub struct TestHarness {
    pub server_url: String,
    pub state: SharedState,
    pub http: Client,
    _shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_rate_limit(1_000).await
    }

    pub async fn with_rate_limit(max_requests: usize) -> Self {
        let mut config = ServerConfig::default();
        config.rate_limit.max_requests = max_requests;
        Self::with_config(config).await
    }

    pub async fn with_config(config: ServerConfig) -> Self {
        let state = create_shared_state(config);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let port = next_port();
        let addr: SocketAddr = ([127, 0, 0, 1], port).into();
        let server_url = format!("http://127.0.0.1:{}", port);

        let router = create_router(state.clone());
        let listener = TcpListener::bind(addr).await.expect("Bind should succeed");

        tokio::spawn(async move {
            axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        for _ in 0..10 {
            if Client::new()
                .get(format!("{}/health", server_url))
                .send()
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        Self {
            server_url,
            state,
            http: Client::new(),
            _shutdown: Some(shutdown_tx),
        }
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = self
            .http
            .get(format!("{}{}", self.server_url, path))
            .send()
            .await
            .expect("Request should succeed");
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .http
            .post(format!("{}{}", self.server_url, path))
            .json(&body)
            .send()
            .await
            .expect("Request should succeed");
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }
}

#[tokio::test]
async fn test_health_and_status() {
    let harness = TestHarness::new().await;

    let (status, body) = harness.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = harness.get("/api/fhe").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "operational");
    assert_eq!(body["endpoints"]["compute"], "/api/fhe/compute");

    let (status, body) = harness.post("/api/fhe", json!({ "operation": "status" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert!(body["timestamp"].as_u64().is_some());
}

#[tokio::test]
async fn test_info_endpoints() {
    let harness = TestHarness::new().await;

    for path in ["/api/fhe/encrypt", "/api/fhe/decrypt", "/api/fhe/compute", "/api/keys"] {
        let (status, body) = harness.get(path).await;
        assert_eq!(status, StatusCode::OK, "{}", path);
        assert!(body["message"].is_string(), "{}", path);
    }

    let (_, body) = harness.get("/api/fhe/compute").await;
    assert_eq!(body["supportedOperations"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn test_missing_fields_are_bad_requests() {
    let harness = TestHarness::new().await;

    let cases = [
        ("/api/fhe/encrypt", json!({ "type": "euint32" }), "Value is required"),
        ("/api/fhe/decrypt", json!({ "encryptedData": "0x01" }), "Contract address is required"),
        ("/api/fhe/compute", json!({ "operands": [1, 2] }), "Operation type is required"),
        ("/api/keys", json!({}), "Unknown action. Use: info, status"),
        ("/api/fhe", json!({ "data": 1 }), "Unknown operation"),
    ];

    for (path, body, message) in cases {
        let (status, resp) = harness.post(path, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", path);
        assert_eq!(resp["error"], message, "{}", path);
    }
}

#[tokio::test]
async fn test_valid_requests() {
    let harness = TestHarness::new().await;
    let address = "0x1234567890123456789012345678901234567890";

    let (status, body) = harness
        .post("/api/fhe/encrypt", json!({ "value": 1000, "type": "euint32" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["bits"], 32);

    let (status, body) = harness
        .post("/api/fhe/encrypt", json!({ "value": true, "type": "ebool" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["value"], true);

    let (status, body) = harness
        .post(
            "/api/fhe/decrypt",
            json!({ "encryptedData": "0xdead", "contractAddress": address, "account": address }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["account"], address);

    let (status, body) = harness
        .post(
            "/api/fhe/compute",
            json!({ "operation": "max", "operands": [3, 9, 4], "contractAddress": address }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["operandCount"], 3);
    assert_eq!(body["info"]["contractAddress"], address);

    let (status, body) = harness.post("/api/keys", json!({ "action": "info" })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["publicKeyManagement"].is_string());
}

#[tokio::test]
async fn test_invalid_address_is_rejected() {
    let harness = TestHarness::new().await;

    let (status, body) = harness
        .post(
            "/api/fhe/decrypt",
            json!({ "encryptedData": "0xdead", "contractAddress": "0x123", "account": "0x123" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid Ethereum address format");
}

#[tokio::test]
async fn test_rate_limit_per_client() {
    let harness = TestHarness::with_rate_limit(3).await;

    for _ in 0..3 {
        let (status, _) = harness.get("/api/keys").await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = harness.get("/api/keys").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].as_str().unwrap().contains("Too many requests"));

    // A forwarded header from an untrusted peer does not open a new window
    let resp = harness
        .http
        .get(format!("{}/api/keys", harness.server_url))
        .header("x-forwarded-for", "203.0.113.7")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    let (status, _) = harness.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(harness.state.rate_limiter.as_ref().unwrap().tracked_clients(), 1);
}

#[tokio::test]
async fn test_rate_limit_trusts_forwarded_behind_proxy() {
    let mut config = ServerConfig::default();
    config.rate_limit.max_requests = 2;
    config.trust_forwarded_headers = true;
    let harness = TestHarness::with_config(config).await;

    let keys = |forwarded: &'static str| {
        harness
            .http
            .get(format!("{}/api/keys", harness.server_url))
            .header("x-forwarded-for", forwarded)
            .send()
    };

    for _ in 0..2 {
        assert_eq!(keys("198.51.100.1").await.unwrap().status(), StatusCode::OK);
    }
    assert_eq!(
        keys("198.51.100.1").await.unwrap().status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    // A different forwarded client has its own window
    assert_eq!(keys("203.0.113.7").await.unwrap().status(), StatusCode::OK);
    assert_eq!(harness.state.rate_limiter.as_ref().unwrap().tracked_clients(), 2);
}
