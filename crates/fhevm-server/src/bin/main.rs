//! fhevm-server binary: FHEVM validation endpoints
//!
//! Run with:
//! ```bash
//! cargo run -p fhevm-server -- --port 3000
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use fhevm_server::{ServerBuilder, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fhevm-server")]
#[command(about = "FHEVM validation endpoints")]
struct Args {
    /// JSON server config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen port (overrides the config's bind address)
    #[arg(long)]
    port: Option<u16>,

    /// Requests per client per window
    #[arg(long)]
    rate_limit: Option<usize>,

    /// Disable the rate limiter
    #[arg(long)]
    no_rate_limit: bool,

    /// Disable the /metrics endpoint
    #[arg(long)]
    no_metrics: bool,

    /// Rate limit on x-forwarded-for (only behind a trusted proxy)
    #[arg(long)]
    trust_forwarded_headers: bool,

    /// Write the effective config to this path and exit
    #[arg(long)]
    dump_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fhevm_server=info".parse()?))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(max) = args.rate_limit {
        config.rate_limit.max_requests = max;
    }
    if args.no_rate_limit {
        config.rate_limit.enabled = false;
    }
    if args.no_metrics {
        config.enable_metrics = false;
    }
    if args.trust_forwarded_headers {
        config.trust_forwarded_headers = true;
    }

    if let Some(path) = args.dump_config {
        config.save(&path)?;
        println!("[OK] Wrote config to {}", path.display());
        return Ok(());
    }

    let mut builder = ServerBuilder::new(config);
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    let server = builder.build()?;

    let state = server.state();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(state.config.rate_limit.window().max(Duration::from_secs(1)));
        loop {
            interval.tick().await;
            if let Some(limiter) = &state.rate_limiter {
                limiter.prune();
            }
        }
    });

    tracing::info!(addr = %server.addr(), "Server ready");
    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
