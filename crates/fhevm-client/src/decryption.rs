//! Decryption request helper
//!
//! A decryption is a round trip with the Gateway:
//! 1. The user signs an EIP-712 [`DecryptionAuthorization`]
//! 2. The signed request is submitted to the Gateway
//! 3. The Gateway is polled until it reports a value or an error
//!
//! [`Decryptor::request_decryption`] returns a [`DecryptionHandle`] in the
//! `pending` state immediately and drives the round trip in a background
//! task. There is no built-in timeout or cancellation: wrap
//! [`DecryptionHandle::wait`] in `tokio::time::timeout` and drop stale
//! handles as needed.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{sol, Eip712Domain};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use fhevm_core::{ClientConfig, DecryptedValue, DecryptionResult};

use crate::error::{ClientError, Result};

sol! {
    /// Typed-data message a user signs to authorize decryption of a handle
    #[derive(Debug, PartialEq, Eq)]
    struct DecryptionAuthorization {
        address contractAddress;
        uint256 handle;
        address userAddress;
    }
}

/// EIP-712 domain name used for Gateway authorizations
pub const GATEWAY_DOMAIN_NAME: &str = "FHEVM Gateway";
pub const GATEWAY_DOMAIN_VERSION: &str = "1";

/// Domain binding authorizations to a chain and, when known, the Gateway contract
pub fn gateway_domain(chain_id: u64, gateway_address: Option<Address>) -> Eip712Domain {
    Eip712Domain::new(
        Some(GATEWAY_DOMAIN_NAME.into()),
        Some(GATEWAY_DOMAIN_VERSION.into()),
        Some(U256::from(chain_id)),
        gateway_address,
        None,
    )
}

/// Signs decryption authorizations on behalf of a user
#[async_trait]
pub trait AuthorizationSigner: Send + Sync {
    fn signer_address(&self) -> Address;

    async fn sign_authorization(
        &self,
        authorization: &DecryptionAuthorization,
        domain: &Eip712Domain,
    ) -> Result<Bytes>;
}

#[async_trait]
impl AuthorizationSigner for PrivateKeySigner {
    fn signer_address(&self) -> Address {
        self.address()
    }

    async fn sign_authorization(
        &self,
        authorization: &DecryptionAuthorization,
        domain: &Eip712Domain,
    ) -> Result<Bytes> {
        let signature = self
            .sign_typed_data_sync(authorization, domain)
            .map_err(|e| ClientError::Signing(e.to_string()))?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }
}

/// What a caller asks the Gateway to decrypt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptionRequest {
    pub contract_address: Address,
    pub handle: U256,
    pub user_address: Address,
}

impl DecryptionRequest {
    pub fn authorization(&self) -> DecryptionAuthorization {
        DecryptionAuthorization {
            contractAddress: self.contract_address,
            handle: self.handle,
            userAddress: self.user_address,
        }
    }
}

/// Request body sent to the Gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedDecryptionRequest {
    #[serde(flatten)]
    pub request: DecryptionRequest,
    pub signature: Bytes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    request_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PollStatus {
    Pending,
    Success,
    Error,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    status: PollStatus,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// One observation of a request at the Gateway
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayPoll {
    Pending,
    /// Raw decrypted value in whatever representation the Gateway uses
    Ready(Value),
    Failed(String),
}

/// External service holding decryption authority
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Submit a signed request; returns the Gateway's request id
    async fn submit(&self, request: &SignedDecryptionRequest) -> Result<String>;

    async fn poll(&self, request_id: &str) -> Result<GatewayPoll>;
}

/// Gateway reached over HTTP
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        if !resp.status().is_success() {
            return Err(ClientError::Gateway {
                status: resp.status().as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn submit(&self, request: &SignedDecryptionRequest) -> Result<String> {
        let url = format!("{}/decryption", self.base_url);
        let resp = self.http.post(&url).json(request).send().await?;
        let body: SubmitResponse = Self::check(resp).await?.json().await?;
        Ok(body.request_id)
    }

    async fn poll(&self, request_id: &str) -> Result<GatewayPoll> {
        let url = format!("{}/decryption/{}", self.base_url, request_id);
        let resp = self.http.get(&url).send().await?;
        let body: PollResponse = Self::check(resp).await?.json().await?;

        Ok(match body.status {
            PollStatus::Pending => GatewayPoll::Pending,
            PollStatus::Success => GatewayPoll::Ready(body.value.unwrap_or(Value::Null)),
            PollStatus::Error => GatewayPoll::Failed(
                body.error.unwrap_or_else(|| "gateway reported an error".to_string()),
            ),
        })
    }
}

/// Normalize a decrypted value of unknown wire representation
///
/// Accepts booleans, non-negative integers, and decimal or `0x`-hex
/// strings up to 256 bits.
pub fn parse_decrypted_value(raw: &Value) -> Result<DecryptedValue> {
    match raw {
        Value::Bool(b) => Ok(DecryptedValue::Bool(*b)),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                return Ok(DecryptedValue::Uint(U256::from(u)));
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < u128::MAX as f64 => {
                    Ok(DecryptedValue::Uint(U256::from(f as u128)))
                }
                _ => Err(ClientError::UnparsableValue(n.to_string())),
            }
        }
        Value::String(s) => parse_numeric_str(s.trim())
            .map(DecryptedValue::Uint)
            .ok_or_else(|| ClientError::UnparsableValue(s.clone())),
        other => Err(ClientError::UnparsableValue(other.to_string())),
    }
}

fn parse_numeric_str(s: &str) -> Option<U256> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex.is_empty() {
            return None;
        }
        return U256::from_str_radix(hex, 16).ok();
    }
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    U256::from_str_radix(s, 10).ok()
}

pub fn is_decryption_complete(result: &DecryptionResult) -> bool {
    result.is_complete()
}

/// Observable handle on an in-flight decryption
pub struct DecryptionHandle {
    request: DecryptionRequest,
    rx: watch::Receiver<DecryptionResult>,
}

impl DecryptionHandle {
    pub fn request(&self) -> &DecryptionRequest {
        &self.request
    }

    /// Latest known state
    pub fn current(&self) -> DecryptionResult {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DecryptionResult> {
        self.rx.clone()
    }

    /// Wait for a terminal state
    pub async fn wait(mut self) -> DecryptionResult {
        loop {
            let current = self.rx.borrow_and_update().clone();
            if current.is_complete() {
                return current;
            }
            if self.rx.changed().await.is_err() {
                return self.rx.borrow().clone();
            }
        }
    }
}

/// Drives authorization, submission and polling against a Gateway
#[derive(Clone)]
pub struct Decryptor {
    gateway: Arc<dyn Gateway>,
    signer: Arc<dyn AuthorizationSigner>,
    domain: Eip712Domain,
    poll_interval: Duration,
}

impl Decryptor {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        signer: Arc<dyn AuthorizationSigner>,
        domain: Eip712Domain,
    ) -> Self {
        Self {
            gateway,
            signer,
            domain,
            poll_interval: Duration::from_secs(1),
        }
    }

    /// Build an HTTP-backed decryptor from a client config
    pub fn from_config(
        config: &ClientConfig,
        chain_id: u64,
        signer: Arc<dyn AuthorizationSigner>,
    ) -> Result<Self> {
        let url = config.gateway_url.as_deref().ok_or_else(|| {
            fhevm_core::Error::InvalidConfig("gatewayUrl is required for decryption".to_string())
        })?;

        Ok(Self::new(
            Arc::new(HttpGateway::new(url)),
            signer,
            gateway_domain(chain_id, config.gateway_address),
        )
        .with_poll_interval(config.poll_interval()))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    /// Start a decryption round trip; the handle starts out `pending`
    ///
    /// Must be called from within a tokio runtime. Polling stops once the
    /// handle and every subscription to it are dropped.
    pub fn request_decryption(
        &self,
        contract_address: Address,
        handle: U256,
        user_address: Address,
    ) -> DecryptionHandle {
        let request = DecryptionRequest {
            contract_address,
            handle,
            user_address,
        };
        let (tx, rx) = watch::channel(DecryptionResult::pending());

        let this = self.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                outcome = this.drive(request) => outcome,
                _ = tx.closed() => {
                    tracing::debug!(handle = %request.handle, "Decryption handle dropped, stopped polling");
                    return;
                }
            };
            let next = match outcome {
                Ok(value) => DecryptionResult::success(value),
                Err(e) => {
                    tracing::warn!(
                        contract = %request.contract_address,
                        handle = %request.handle,
                        error = %e,
                        "Decryption failed"
                    );
                    DecryptionResult::failure(e.to_string())
                }
            };
            tx.send_modify(|result| {
                result.advance(next);
            });
        });

        DecryptionHandle { request, rx }
    }

    async fn drive(&self, request: DecryptionRequest) -> Result<DecryptedValue> {
        let signature = self
            .signer
            .sign_authorization(&request.authorization(), &self.domain)
            .await?;

        let request_id = self
            .gateway
            .submit(&SignedDecryptionRequest { request, signature })
            .await?;

        tracing::debug!(request_id = %request_id, "Decryption request accepted by gateway");

        loop {
            match self.gateway.poll(&request_id).await? {
                GatewayPoll::Pending => tokio::time::sleep(self.poll_interval).await,
                GatewayPoll::Ready(raw) => return parse_decrypted_value(&raw),
                GatewayPoll::Failed(message) => return Err(ClientError::DecryptionFailed(message)),
            }
        }
    }
}
