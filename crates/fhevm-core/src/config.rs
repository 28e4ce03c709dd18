//! Client configuration

use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// SDK version reported by clients and the validation service
pub const SDK_VERSION: &str = "0.1.0";

/// Configuration supplied once when a client is created
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Network provider endpoint (JSON-RPC URL)
    pub provider: String,
    /// Expected chain id; checked against the provider during init
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Gateway base URL for decryption requests
    #[serde(default)]
    pub gateway_url: Option<String>,
    /// Gateway contract, used as the EIP-712 verifying contract
    #[serde(default)]
    pub gateway_address: Option<Address>,
    /// Access control list contract
    #[serde(default)]
    pub acl_address: Option<Address>,
    /// KMS verifier contract
    #[serde(default)]
    pub kms_verifier_address: Option<Address>,
    /// Delay between Gateway polls
    #[serde(default = "default_poll_interval_ms")]
    pub decryption_poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

impl ClientConfig {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            chain_id: None,
            gateway_url: None,
            gateway_address: None,
            acl_address: None,
            kms_verifier_address: None,
            decryption_poll_interval_ms: default_poll_interval_ms(),
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn with_gateway(mut self, url: impl Into<String>, address: Option<Address>) -> Self {
        self.gateway_url = Some(url.into().trim_end_matches('/').to_string());
        self.gateway_address = address;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.decryption_poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.decryption_poll_interval_ms)
    }

    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        if !crate::validation::is_valid_config(&config) {
            return Err(crate::Error::InvalidConfig(
                "provider must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8545").with_chain_id(crate::constants::SEPOLIA_CHAIN_ID)
    }
}
