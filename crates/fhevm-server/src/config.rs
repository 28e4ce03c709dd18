//! Server configuration

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sliding-window rate limit applied per client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Requests allowed inside one window
    pub max_requests: usize,
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 10,
            window_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Upper bound on requests handled at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    /// Expose `/metrics` in Prometheus text format
    #[serde(default = "default_true")]
    pub enable_metrics: bool,
    /// Key the rate limiter on `x-forwarded-for`; only safe behind a proxy that sets it
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

fn default_max_concurrent() -> usize {
    256
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: ([127, 0, 0, 1], 3000).into(),
            rate_limit: RateLimitConfig::default(),
            max_concurrent_requests: default_max_concurrent(),
            enable_metrics: true,
            trust_forwarded_headers: false,
        }
    }
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
