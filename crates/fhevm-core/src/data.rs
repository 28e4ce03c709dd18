//! Encrypted payloads, client state and decryption results

use std::fmt;

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::EncryptedType;

/// Encrypted payload ready for contract submission
///
/// Immutable once produced. Consumers take it by value when binding it to
/// a contract call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    payload: Bytes,
    #[serde(rename = "type")]
    ty: EncryptedType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
}

impl EncryptedData {
    pub fn new(payload: impl Into<Bytes>, ty: EncryptedType) -> Self {
        Self {
            payload: payload.into(),
            ty,
            signature: None,
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn encrypted_type(&self) -> EncryptedType {
        self.ty
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// A payload is submittable only if it carries at least one byte
    pub fn is_submittable(&self) -> bool {
        !self.payload.is_empty()
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

/// Authorization artifact binding an encrypted payload to a contract and user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputProof {
    pub payload: Bytes,
    pub contract_address: Address,
    pub user_address: Address,
    pub signature: Bytes,
}

/// Lifecycle phase of a client instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientPhase {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl fmt::Display for ClientPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClientPhase::Uninitialized => "uninitialized",
            ClientPhase::Initializing => "initializing",
            ClientPhase::Ready => "ready",
            ClientPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Snapshot of a client's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientState {
    pub phase: ClientPhase,
    pub public_key: Option<Bytes>,
    pub chain_id: Option<u64>,
}

impl ClientState {
    pub fn uninitialized() -> Self {
        Self {
            phase: ClientPhase::Uninitialized,
            public_key: None,
            chain_id: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase == ClientPhase::Ready
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::uninitialized()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecryptionStatus {
    Idle,
    Pending,
    Success,
    Error,
}

impl DecryptionStatus {
    fn rank(&self) -> u8 {
        match self {
            DecryptionStatus::Idle => 0,
            DecryptionStatus::Pending => 1,
            DecryptionStatus::Success | DecryptionStatus::Error => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DecryptionStatus::Success | DecryptionStatus::Error)
    }
}

impl fmt::Display for DecryptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecryptionStatus::Idle => "idle",
            DecryptionStatus::Pending => "pending",
            DecryptionStatus::Success => "success",
            DecryptionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Normalized plaintext returned by the Gateway
///
/// Equality is numeric: `Bool(true) == Uint(1)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecryptedValue {
    Bool(bool),
    Uint(U256),
}

impl DecryptedValue {
    /// Numeric view; booleans map to 0 / 1
    pub fn as_uint(&self) -> U256 {
        match self {
            DecryptedValue::Bool(b) => U256::from(*b as u8),
            DecryptedValue::Uint(v) => *v,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DecryptedValue::Bool(b) => Some(*b),
            DecryptedValue::Uint(_) => None,
        }
    }
}

impl PartialEq for DecryptedValue {
    fn eq(&self, other: &Self) -> bool {
        self.as_uint() == other.as_uint()
    }
}

impl Eq for DecryptedValue {}

impl fmt::Display for DecryptedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecryptedValue::Bool(b) => write!(f, "{}", b),
            DecryptedValue::Uint(v) => write!(f, "{}", v),
        }
    }
}

/// State of one decryption request
///
/// `value` is present only on success and `error` only on error; the
/// constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionResult {
    status: DecryptionStatus,
    value: Option<DecryptedValue>,
    error: Option<String>,
}

impl DecryptionResult {
    pub fn idle() -> Self {
        Self {
            status: DecryptionStatus::Idle,
            value: None,
            error: None,
        }
    }

    pub fn pending() -> Self {
        Self {
            status: DecryptionStatus::Pending,
            value: None,
            error: None,
        }
    }

    pub fn success(value: DecryptedValue) -> Self {
        Self {
            status: DecryptionStatus::Success,
            value: Some(value),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: DecryptionStatus::Error,
            value: None,
            error: Some(message.into()),
        }
    }

    pub fn status(&self) -> DecryptionStatus {
        self.status
    }

    pub fn value(&self) -> Option<DecryptedValue> {
        self.value
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move forward to `next`; backward or sideways moves are refused
    pub fn advance(&mut self, next: DecryptionResult) -> bool {
        if next.status.rank() <= self.status.rank() {
            return false;
        }
        *self = next;
        true
    }
}

impl Default for DecryptionResult {
    fn default() -> Self {
        Self::idle()
    }
}
