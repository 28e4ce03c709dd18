//! Validation server

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::metrics::init_prometheus_recorder;
use crate::routes::create_router;
use crate::state::{ServerState, SharedState};

pub struct FhevmServer {
    state: SharedState,
    addr: SocketAddr,
}

impl FhevmServer {
    pub fn new(state: ServerState) -> Self {
        let addr = state.config.bind;
        Self {
            state: SharedState::new(state),
            addr,
        }
    }

    /// Run until the process exits
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run until `shutdown` resolves
    pub async fn run_until(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let router = create_router(self.state);

        tracing::info!("Starting FHEVM validation server on {}", self.addr);

        let listener = TcpListener::bind(self.addr).await?;
        axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the server state for testing
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }
}

/// Builder for FhevmServer
pub struct ServerBuilder {
    config: ServerConfig,
    metrics: bool,
}

impl ServerBuilder {
    pub fn new(config: ServerConfig) -> Self {
        let metrics = config.enable_metrics;
        Self { config, metrics }
    }

    pub fn addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind = addr;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.bind = ([0, 0, 0, 0], port).into();
        self
    }

    /// Skip installing the global Prometheus recorder (useful for testing)
    pub fn without_metrics(mut self) -> Self {
        self.metrics = false;
        self
    }

    pub fn build(self) -> Result<FhevmServer> {
        let mut state = ServerState::new(self.config);
        if self.metrics {
            state = state.with_metrics(init_prometheus_recorder()?);
        }
        Ok(FhevmServer::new(state))
    }
}
