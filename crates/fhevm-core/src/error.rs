//! Error types for fhevm-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid encrypted type: {0}")]
    InvalidType(String),

    #[error("{0}")]
    InvalidAddress(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}
