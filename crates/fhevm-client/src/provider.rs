//! Network provider seam
//!
//! One unified provider carries reads, transaction submission and the
//! wallet's accounts. The client only reads from it; callers construct it.

use alloy_primitives::{Address, Bytes, B256, U64};
use alloy_rpc_client::{ClientBuilder, RpcClient};
use alloy_rpc_types::{BlockNumberOrTag, TransactionRequest};
use async_trait::async_trait;

use crate::error::{ClientError, Result};

/// Wallet / RPC connection supplied by the caller
#[async_trait]
pub trait NetworkProvider: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;

    /// Accounts the wallet can sign for
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// Read-only call against the latest block
    async fn call(&self, tx: TransactionRequest) -> Result<Bytes>;

    /// Submit a transaction for the wallet to sign; returns the tx hash
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256>;
}

/// JSON-RPC provider backed by alloy's RPC client
pub struct RpcProvider {
    client: RpcClient,
    url: String,
}

impl RpcProvider {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = ClientBuilder::default()
            .connect(url)
            .await
            .map_err(|e| ClientError::Provider(format!("Failed to connect to {}: {}", url, e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl NetworkProvider for RpcProvider {
    async fn chain_id(&self) -> Result<u64> {
        let id: U64 = self
            .client
            .request_noparams("eth_chainId")
            .await
            .map_err(|e| ClientError::from_provider_message(e.to_string()))?;
        Ok(id.to::<u64>())
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        self.client
            .request_noparams("eth_accounts")
            .await
            .map_err(|e| ClientError::from_provider_message(e.to_string()))
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes> {
        self.client
            .request("eth_call", (tx, BlockNumberOrTag::Latest))
            .await
            .map_err(|e| ClientError::from_provider_message(e.to_string()))
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256> {
        let hash: B256 = self
            .client
            .request("eth_sendTransaction", (tx,))
            .await
            .map_err(|e| ClientError::from_provider_message(e.to_string()))?;

        tracing::debug!(tx_hash = %hash, provider = %self.url, "Transaction submitted");
        Ok(hash)
    }
}
