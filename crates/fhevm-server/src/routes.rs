//! HTTP routes for the validation service

use std::net::SocketAddr;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::{
    body::Bytes,
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};

use fhevm_core::validation::validate_contract_address;
use fhevm_core::{EncryptedType, SDK_VERSION};

use crate::error::{Result, ServerError};
use crate::metrics;
use crate::state::SharedState;

/// Operations contracts can run on encrypted operands
pub const ARITHMETIC_OPERATIONS: [&str; 4] = ["add", "sub", "mul", "div"];
pub const COMPARISON_OPERATIONS: [&str; 6] = ["eq", "ne", "lt", "lte", "gt", "gte"];
pub const OTHER_OPERATIONS: [&str; 2] = ["min", "max"];

pub fn is_supported_operation(op: &str) -> bool {
    ARITHMETIC_OPERATIONS
        .iter()
        .chain(OTHER_OPERATIONS.iter())
        .chain(COMPARISON_OPERATIONS.iter())
        .any(|o| *o == op)
}

fn supported_operations() -> Vec<&'static str> {
    ARITHMETIC_OPERATIONS
        .iter()
        .chain(OTHER_OPERATIONS.iter())
        .chain(COMPARISON_OPERATIONS.iter())
        .copied()
        .collect()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: SDK_VERSION.to_string(),
        uptime_secs: state.uptime().as_secs(),
    })
}

async fn metrics_text(State(state): State<SharedState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

/// Parse a request body as JSON; any failure is a 400
fn json_body(body: &[u8]) -> Result<Value> {
    serde_json::from_slice(body).map_err(|_| ServerError::BadRequest("Invalid request".to_string()))
}

/// Field is present and not an empty/zero/false placeholder
fn truthy<'a>(body: &'a Value, key: &str) -> Option<&'a Value> {
    body.get(key).filter(|v| match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    })
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

async fn fhe_status() -> Json<Value> {
    Json(json!({
        "status": "operational",
        "message": "FHE operations API is running",
        "endpoints": {
            "encrypt": "/api/fhe/encrypt",
            "decrypt": "/api/fhe/decrypt",
            "compute": "/api/fhe/compute",
        },
    }))
}

async fn fhe_operation(body: Bytes) -> Result<Json<Value>> {
    let body = json_body(&body)?;
    match body.get("operation").and_then(Value::as_str) {
        Some("status") => Ok(Json(json!({
            "status": "ready",
            "timestamp": unix_timestamp(),
        }))),
        _ => Err(ServerError::BadRequest("Unknown operation".to_string())),
    }
}

async fn encrypt_info() -> Json<Value> {
    Json(json!({
        "message": "Encryption endpoint",
        "method": "POST",
        "usage": "Send { value, type } to validate a value for encryption",
        "note": "Encryption is performed client-side with FhevmClient::encrypt",
    }))
}

async fn encrypt(body: Bytes) -> Result<Json<Value>> {
    let body = json_body(&body)?;

    let value = match body.get("value") {
        None | Some(Value::Null) => {
            return Err(ServerError::BadRequest("Value is required".to_string()))
        }
        Some(v) => v,
    };

    let tag = truthy(&body, "type")
        .and_then(Value::as_str)
        .ok_or_else(|| ServerError::BadRequest("Encryption type is required (e.g., euint32)".to_string()))?;

    let ty = tag
        .parse::<EncryptedType>()
        .ok()
        .filter(EncryptedType::is_encryptable)
        .ok_or_else(|| {
            let valid: Vec<&str> = EncryptedType::ENCRYPTABLE.iter().map(|t| t.as_str()).collect();
            ServerError::BadRequest(format!("Invalid type. Must be one of: {}", valid.join(", ")))
        })?;

    let admissible = fhevm_core::PlainValue::from_json(value)
        .is_some_and(|plain| fhevm_core::validation::is_valid_value_for_type(&plain, ty));
    if !admissible {
        return Err(ServerError::BadRequest(format!("Value {} is not valid for {}", value, ty)));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Encryption should be performed client-side using FhevmClient",
        "data": {
            "value": value,
            "type": ty,
            "bits": ty.bits(),
        },
    })))
}

async fn decrypt_info() -> Json<Value> {
    Json(json!({
        "message": "Decryption endpoint",
        "method": "POST",
        "usage": "Send { encryptedData, contractAddress, account } to request decryption",
        "note": "Decryption is handled by the Gateway via Decryptor::request_decryption",
    }))
}

async fn decrypt(body: Bytes) -> Result<Json<Value>> {
    let body = json_body(&body)?;

    let encrypted_data = truthy(&body, "encryptedData")
        .ok_or_else(|| ServerError::BadRequest("Encrypted data is required".to_string()))?;
    let contract_address = truthy(&body, "contractAddress")
        .ok_or_else(|| ServerError::BadRequest("Contract address is required".to_string()))?;
    let account = truthy(&body, "account")
        .ok_or_else(|| ServerError::BadRequest("Account address is required".to_string()))?;

    for address in [contract_address, account] {
        let address = address
            .as_str()
            .ok_or_else(|| ServerError::BadRequest("Invalid Ethereum address format".to_string()))?;
        validate_contract_address(address).map_err(|e| ServerError::BadRequest(e.to_string()))?;
    }

    Ok(Json(json!({
        "success": true,
        "message": "Decryption requests are processed via the Gateway",
        "process": {
            "step1": "Request decryption permission from contract",
            "step2": "Sign the EIP-712 DecryptionAuthorization with your wallet",
            "step3": "Gateway processes and returns decrypted value",
            "step4": "Poll the request until it completes",
        },
        "data": {
            "encryptedData": encrypted_data,
            "contractAddress": contract_address,
            "account": account,
        },
    })))
}

async fn compute_info() -> Json<Value> {
    Json(json!({
        "message": "Homomorphic Computation endpoint",
        "method": "POST",
        "usage": "Send { operation, operands, contractAddress } to learn about FHE computations",
        "note": "Computations happen on-chain in smart contracts",
        "supportedOperations": supported_operations(),
    }))
}

async fn compute(body: Bytes) -> Result<Json<Value>> {
    let body = json_body(&body)?;

    let operation = truthy(&body, "operation")
        .ok_or_else(|| ServerError::BadRequest("Operation type is required".to_string()))?;
    let operands = body
        .get("operands")
        .and_then(Value::as_array)
        .ok_or_else(|| ServerError::BadRequest("Operands array is required".to_string()))?;

    let operation = operation
        .as_str()
        .filter(|op| is_supported_operation(op))
        .ok_or_else(|| {
            ServerError::BadRequest(format!(
                "Invalid operation. Must be one of: {}",
                supported_operations().join(", ")
            ))
        })?;

    let contract_address = truthy(&body, "contractAddress")
        .cloned()
        .unwrap_or_else(|| Value::String("Not specified".to_string()));

    Ok(Json(json!({
        "success": true,
        "message": "FHE computations are performed on-chain",
        "info": {
            "operation": operation,
            "operandCount": operands.len(),
            "contractAddress": contract_address,
        },
        "supportedOperations": {
            "arithmetic": ARITHMETIC_OPERATIONS,
            "comparison": COMPARISON_OPERATIONS,
            "other": OTHER_OPERATIONS,
        },
    })))
}

async fn keys_info() -> Json<Value> {
    Json(json!({
        "message": "FHE Key Management API",
        "info": {
            "publicKey": "Loaded by the encryption backend during FhevmClient::init",
            "privateKey": "Never leaves the Gateway, used only for authorized decryption",
        },
        "workflow": {
            "encryption": ["Fetch public key", "Encrypt input", "Submit to contract"],
            "decryption": ["Request permission", "Sign authorization", "Gateway decrypts", "Value returned"],
        },
    }))
}

async fn keys_action(body: Bytes) -> Result<Json<Value>> {
    let body = json_body(&body)?;
    match body.get("action").and_then(Value::as_str) {
        Some("info") => Ok(Json(json!({
            "publicKeyManagement": "Handled by the client SDK",
            "initialization": "Use FhevmContext::start or FhevmClient::init",
        }))),
        Some("status") => Ok(Json(json!({
            "status": "ready",
            "message": "Key management is handled by the SDK",
            "sdk": format!("fhevm-client {}", SDK_VERSION),
        }))),
        _ => Err(ServerError::BadRequest("Unknown action. Use: info, status".to_string())),
    }
}

/// Identify the caller by socket address; the forwarded header is only
/// consulted when the server sits behind a trusted proxy
fn client_id(
    headers: &HeaderMap,
    connect: Option<&ConnectInfo<SocketAddr>>,
    trust_forwarded: bool,
) -> String {
    let forwarded = trust_forwarded
        .then(|| headers.get("x-forwarded-for"))
        .flatten()
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| connect.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Rate limit and instrument API requests
async fn api_guard(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    if let Some(limiter) = &state.rate_limiter {
        let client = client_id(
            request.headers(),
            request.extensions().get(),
            state.config.trust_forwarded_headers,
        );
        if !limiter.check(&client) {
            tracing::warn!(client = %client, endpoint = %endpoint, "Rate limit exceeded");
            metrics::record_rate_limited(&endpoint);
            return ServerError::RateLimited.into_response();
        }
    }

    let start = Instant::now();
    let response = next.run(request).await;
    metrics::record_api_request(
        &endpoint,
        metrics::outcome_for_status(response.status().as_u16()),
        start.elapsed(),
    );
    response
}

/// Create the router with all routes
pub fn create_router(state: SharedState) -> Router {
    let api = Router::new()
        .route("/api/fhe", get(fhe_status).post(fhe_operation))
        .route("/api/fhe/encrypt", get(encrypt_info).post(encrypt))
        .route("/api/fhe/decrypt", get(decrypt_info).post(decrypt))
        .route("/api/fhe/compute", get(compute_info).post(compute))
        .route("/api/keys", get(keys_info).post(keys_action))
        .route_layer(middleware::from_fn_with_state(state.clone(), api_guard));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .merge(api)
        .layer(ConcurrencyLimitLayer::new(state.config.max_concurrent_requests))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::state::create_shared_state;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use tower::ServiceExt;

    fn router_with_limit(max_requests: usize) -> Router {
        let mut config = ServerConfig::default();
        config.rate_limit.max_requests = max_requests;
        create_router(create_shared_state(config))
    }

    async fn post(router: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(
                HttpRequest::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[test]
    fn test_supported_operations() {
        for op in ["add", "sub", "mul", "div", "min", "max", "eq", "ne", "lt", "lte", "gt", "gte"] {
            assert!(is_supported_operation(op), "{}", op);
        }
        assert!(!is_supported_operation("pow"));
        assert!(!is_supported_operation("ADD"));
        assert_eq!(supported_operations().len(), 12);
    }

    #[test]
    fn test_client_id() {
        let mut headers = HeaderMap::new();
        let addr = ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 4000)));
        assert_eq!(client_id(&headers, Some(&addr), false), "10.0.0.1");
        assert_eq!(client_id(&headers, None, false), "anonymous");

        headers.insert("x-forwarded-for", "1.2.3.4, 10.0.0.1".parse().unwrap());
        assert_eq!(client_id(&headers, Some(&addr), true), "1.2.3.4");
        // untrusted header is ignored
        assert_eq!(client_id(&headers, Some(&addr), false), "10.0.0.1");
        assert_eq!(client_id(&headers, None, false), "anonymous");
    }

    #[tokio::test]
    async fn test_encrypt_validation() {
        let router = router_with_limit(100);

        let (status, body) = post(&router, "/api/fhe/encrypt", r#"{"type":"euint8"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Value is required");

        let (status, body) = post(&router, "/api/fhe/encrypt", r#"{"value":1}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("type is required"));

        let (status, body) = post(&router, "/api/fhe/encrypt", r#"{"value":1,"type":"euint128"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid type"));

        let (status, _) = post(&router, "/api/fhe/encrypt", r#"{"value":300,"type":"euint8"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = post(&router, "/api/fhe/encrypt", r#"{"value":0,"type":"euint8"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["type"], "euint8");
        assert_eq!(body["data"]["value"], 0);

        let (status, _) = post(&router, "/api/fhe/encrypt", "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_decrypt_requires_fields() {
        let router = router_with_limit(100);
        let contract = "0x1234567890123456789012345678901234567890";

        let (status, body) = post(&router, "/api/fhe/decrypt", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Encrypted data is required");

        let body_json = json!({"encryptedData": "0xabc", "contractAddress": contract}).to_string();
        let (status, body) = post(&router, "/api/fhe/decrypt", &body_json).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Account address is required");

        let body_json = json!({"encryptedData": "0xabc", "contractAddress": 5, "account": contract}).to_string();
        let (status, body) = post(&router, "/api/fhe/decrypt", &body_json).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid Ethereum address format");

        let body_json = json!({"encryptedData": "0xabc", "contractAddress": contract, "account": contract}).to_string();
        let (status, body) = post(&router, "/api/fhe/decrypt", &body_json).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["contractAddress"], contract);
    }

    #[tokio::test]
    async fn test_compute() {
        let router = router_with_limit(100);

        let (status, body) = post(&router, "/api/fhe/compute", r#"{"operation":"add"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Operands array is required");

        let (status, _) = post(&router, "/api/fhe/compute", r#"{"operation":"pow","operands":[1]}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = post(&router, "/api/fhe/compute", r#"{"operation":"lte","operands":[1,2]}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["info"]["operandCount"], 2);
        assert_eq!(body["info"]["contractAddress"], "Not specified");
    }

    #[tokio::test]
    async fn test_operation_and_keys_dispatch() {
        let router = router_with_limit(100);

        let (status, body) = post(&router, "/api/fhe", r#"{"operation":"status"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");

        let (status, body) = post(&router, "/api/fhe", r#"{"operation":"reboot"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unknown operation");

        let (status, body) = post(&router, "/api/keys", r#"{"action":"status"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");

        let (status, _) = post(&router, "/api/keys", r#"{"action":"rotate"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rate_limit_applies_to_api_only() {
        let router = router_with_limit(2);

        for _ in 0..2 {
            let (status, _) = post(&router, "/api/keys", r#"{"action":"info"}"#).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, body) = post(&router, "/api/keys", r#"{"action":"info"}"#).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(body["error"].as_str().unwrap().contains("Too many requests"));

        let response = router
            .clone()
            .oneshot(HttpRequest::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
