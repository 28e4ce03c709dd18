//! fhevm-server: HTTP validation endpoints for FHEVM applications
//!
//! The endpoints validate request shapes and describe where the real work
//! happens (client-side encryption, on-chain computation, Gateway
//! decryption). The only state is a per-client rate limiter.

pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{RateLimitConfig, ServerConfig};
pub use error::ServerError;
pub use routes::create_router;
pub use server::{FhevmServer, ServerBuilder};
pub use state::{create_shared_state, RateLimiter, ServerState, SharedState};
