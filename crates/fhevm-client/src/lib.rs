//! fhevm-client: Client SDK for FHE-enabled EVM chains
//!
//! - [`FhevmClient`]: validates plaintexts and produces encrypted payloads
//! - [`Decryptor`]: signed, polled decryption requests against a Gateway
//! - [`FheContract`]: ABI-driven contract calls through a [`NetworkProvider`]
//! - [`bindings`]: observable wrappers for application code

pub mod backend;
pub mod bindings;
pub mod client;
pub mod contract;
pub mod decryption;
pub mod error;
pub mod events;
pub mod provider;

pub use backend::{FheBackend, PlaceholderBackend};
pub use bindings::{
    ContextStatus, ContractBinding, DecryptBinding, EncryptBinding, FhevmContext, OperationState,
};
pub use client::{ClientBuilder, FhevmClient};
pub use contract::{encrypted_arg, CallOutcome, FheContract};
pub use decryption::{
    gateway_domain, is_decryption_complete, parse_decrypted_value, AuthorizationSigner,
    DecryptionAuthorization, DecryptionHandle, DecryptionRequest, Decryptor, Gateway, GatewayPoll,
    HttpGateway, SignedDecryptionRequest,
};
pub use error::{ClientError, Result};
pub use events::ClientEvent;
pub use provider::{NetworkProvider, RpcProvider};
