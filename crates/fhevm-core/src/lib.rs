//! fhevm-core: Core types and validation for the FHEVM client SDK
//!
//! This crate defines the data that flows between an application, the
//! encryption backend and the chain:
//! - [`EncryptedType`]: the closed set of FHE type tags (`ebool`, `euint8`, ...)
//! - [`PlainValue`]: a plaintext before encryption
//! - [`EncryptedData`] / [`InputProof`]: what gets submitted to a contract
//! - [`DecryptionResult`]: lifecycle of a Gateway decryption request
//!
//! # Trust Model
//!
//! | Component | Holds |
//! |-----------|-------|
//! | Client (this SDK) | Public key, plaintext inputs before encryption |
//! | Contract | Ciphertext handles only |
//! | Gateway | Decryption authority, releases plaintext on a signed request |
//!
//! Nothing here performs homomorphic encryption. The validation layer
//! only decides whether a plaintext is admissible for its declared type;
//! encoding is delegated to a backend in `fhevm-client`.

mod config;
mod data;
mod encrypted_type;
mod error;
mod security;
pub mod validation;
mod value;

pub use config::{ClientConfig, SDK_VERSION};
pub use data::{
    ClientPhase, ClientState, DecryptedValue, DecryptionResult, DecryptionStatus, EncryptedData,
    InputProof,
};
pub use encrypted_type::EncryptedType;
pub use error::Error;
pub use security::{generate_nonce, sanitize_input};
pub use value::PlainValue;

pub use alloy_primitives::{Address, Bytes, U256};

pub type Result<T> = std::result::Result<T, Error>;

/// Chain and validation constants
pub mod constants {
    /// Sepolia testnet
    pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

    /// Zama devnet
    pub const ZAMA_DEVNET_CHAIN_ID: u64 = 8009;

    /// Networks the SDK is deployed against
    pub const SUPPORTED_CHAIN_IDS: [u64; 2] = [SEPOLIA_CHAIN_ID, ZAMA_DEVNET_CHAIN_ID];

    /// Maximum number of values accepted in one batch
    pub const MAX_BATCH_SIZE: usize = 100;

    /// Maximum length of sanitized user input
    pub const MAX_INPUT_LEN: usize = 1000;

    /// Length of a placeholder ECDSA signature (r || s || v)
    pub const SIGNATURE_LEN: usize = 65;
}
