//! FHE backend seam
//!
//! The client validates and shapes requests; a backend performs the actual
//! encoding. [`PlaceholderBackend`] stands in until a real FHE library is
//! wired in: its payloads are deterministic strings and its signatures are
//! all zeros, so nothing downstream may rely on their content.

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;

use fhevm_core::constants::SIGNATURE_LEN;
use fhevm_core::{EncryptedData, EncryptedType, InputProof, PlainValue};

use crate::error::Result;

/// Encoding operations delegated to an external FHE library
#[async_trait]
pub trait FheBackend: Send + Sync {
    /// Fetch the network public key for `chain_id`, if the backend exposes one
    async fn load_public_key(&self, chain_id: u64) -> Result<Option<Bytes>>;

    /// Encode an already-validated plaintext
    async fn encrypt(&self, value: &PlainValue, ty: EncryptedType) -> Result<EncryptedData>;

    /// Produce the proof binding `encrypted` to `contract` and `user`
    async fn input_proof(
        &self,
        encrypted: &EncryptedData,
        contract: Address,
        user: Address,
    ) -> Result<InputProof>;
}

/// Stand-in backend producing `encrypted_<value>_<type>` payloads
#[derive(Debug, Clone, Default)]
pub struct PlaceholderBackend {
    public_key: Option<Bytes>,
}

impl PlaceholderBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a fixed public key from `load_public_key`
    pub fn with_public_key(mut self, key: impl Into<Bytes>) -> Self {
        self.public_key = Some(key.into());
        self
    }
}

#[async_trait]
impl FheBackend for PlaceholderBackend {
    async fn load_public_key(&self, _chain_id: u64) -> Result<Option<Bytes>> {
        Ok(self.public_key.clone())
    }

    async fn encrypt(&self, value: &PlainValue, ty: EncryptedType) -> Result<EncryptedData> {
        let payload = format!("encrypted_{}_{}", value, ty).into_bytes();
        Ok(EncryptedData::new(payload, ty))
    }

    async fn input_proof(
        &self,
        encrypted: &EncryptedData,
        contract: Address,
        user: Address,
    ) -> Result<InputProof> {
        Ok(InputProof {
            payload: encrypted.payload().clone(),
            contract_address: contract,
            user_address: user,
            signature: Bytes::from(vec![0u8; SIGNATURE_LEN]),
        })
    }
}
