//! fhevm-kit: FHEVM client SDK and validation service
//!
//! - [`core`]: data model, validation and configuration
//! - [`client`]: client wrapper, decryption, contract calls and bindings
//! - [`server`]: HTTP validation endpoints

pub use fhevm_client as client;
pub use fhevm_core as core;
pub use fhevm_server as server;

pub use fhevm_client::{
    ClientBuilder, ClientError, Decryptor, FheContract, FhevmClient, FhevmContext,
};
pub use fhevm_core::{ClientConfig, DecryptionResult, EncryptedData, EncryptedType, PlainValue};
