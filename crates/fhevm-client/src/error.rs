//! Client error types

use fhevm_core::EncryptedType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Client not initialized. Call init() first.")]
    NotReady,

    #[error("Invalid value {value} for type {ty}")]
    InvalidValue { value: String, ty: EncryptedType },

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    #[error("Invalid decrypted value format: {0}")]
    UnparsableValue(String),

    #[error("Transaction was rejected by user: {0}")]
    TransactionRejected(String),

    #[error("Insufficient funds for gas fees: {0}")]
    InsufficientFunds(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Gateway error ({status}): {message}")]
    Gateway { status: u16, message: String },

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("FHEVM context has been disposed")]
    Disposed,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] fhevm_core::Error),
}

impl ClientError {
    /// Map a wallet/provider failure message to the display taxonomy
    pub fn from_provider_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("user rejected") || lower.contains("user denied") {
            ClientError::TransactionRejected(message)
        } else if lower.contains("insufficient funds") {
            ClientError::InsufficientFunds(message)
        } else {
            ClientError::Provider(message)
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
