//! fhevm CLI
//!
//! Run with:
//! ```bash
//! cargo run -p fhevm-client --bin fhevm -- check-value --type euint8 42
//! cargo run -p fhevm-client --bin fhevm -- encrypt --rpc-url http://localhost:8545 --type euint32 1000
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use alloy_signer_local::PrivateKeySigner;
use clap::{Parser, Subcommand};
use fhevm_client::{ClientBuilder, Decryptor, FheContract, RpcProvider};
use fhevm_core::validation::{is_supported_network, is_valid_value_for_type, validate_contract_address};
use fhevm_core::{constants, ClientConfig, EncryptedType, PlainValue};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fhevm")]
#[command(about = "FHEVM client toolkit")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether a plaintext is admissible for an encrypted type
    CheckValue {
        #[arg(long = "type")]
        ty: EncryptedType,
        /// JSON value, e.g. `42` or `true`
        value: String,
    },

    /// Validate a contract address
    ValidateAddress { address: String },

    /// List supported networks
    Networks,

    /// Initialize a client and encrypt a value
    Encrypt {
        #[command(flatten)]
        conn: Connection,
        #[arg(long = "type")]
        ty: EncryptedType,
        value: String,
    },

    /// Call a contract method with string arguments
    Call {
        #[command(flatten)]
        conn: Connection,
        #[arg(long)]
        contract: Address,
        /// Human-readable function signature, e.g. `function get() view returns (uint32)`
        #[arg(long)]
        signature: String,
        /// Sender; defaults to the node's first account
        #[arg(long)]
        from: Option<Address>,
        method: String,
        args: Vec<String>,
    },

    /// Request a decryption from the Gateway and wait for it
    Decrypt {
        #[command(flatten)]
        conn: Connection,
        #[arg(long)]
        contract: Address,
        #[arg(long)]
        handle: U256,
        /// Hex private key of the user authorizing the decryption
        #[arg(long)]
        private_key: String,
        /// Give up after this many seconds
        #[arg(long, default_value = "60")]
        timeout_secs: u64,
    },
}

#[derive(clap::Args, Debug)]
struct Connection {
    /// JSON client config; overrides the flags below
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "http://localhost:8545")]
    rpc_url: String,

    #[arg(long)]
    chain_id: Option<u64>,

    #[arg(long)]
    gateway_url: Option<String>,
}

impl Connection {
    fn client_config(&self) -> anyhow::Result<ClientConfig> {
        if let Some(path) = &self.config {
            return Ok(ClientConfig::load(path)?);
        }
        let mut config = ClientConfig::new(&self.rpc_url);
        config.chain_id = self.chain_id;
        if let Some(url) = &self.gateway_url {
            config = config.with_gateway(url, None);
        }
        Ok(config)
    }
}

fn parse_plain(raw: &str) -> anyhow::Result<PlainValue> {
    let json: serde_json::Value = serde_json::from_str(raw)?;
    PlainValue::from_json(&json).ok_or_else(|| anyhow::anyhow!("Not a boolean or number: {}", raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fhevm_client=info".parse()?))
        .init();

    let args = Args::parse();

    match args.command {
        Command::CheckValue { ty, value } => {
            let plain = parse_plain(&value)?;
            if is_valid_value_for_type(&plain, ty) {
                println!("[OK] {} is a valid {}", plain, ty);
            } else {
                println!("[FAIL] {} is not a valid {}", plain, ty);
                std::process::exit(1);
            }
        }

        Command::ValidateAddress { address } => match validate_contract_address(&address) {
            Ok(()) => println!("[OK] {}", address),
            Err(reason) => {
                println!("[FAIL] {}", reason);
                std::process::exit(1);
            }
        },

        Command::Networks => {
            for chain_id in constants::SUPPORTED_CHAIN_IDS {
                let name = match chain_id {
                    constants::SEPOLIA_CHAIN_ID => "sepolia",
                    constants::ZAMA_DEVNET_CHAIN_ID => "zama-devnet",
                    _ => "unknown",
                };
                println!("{:>10}  {}", chain_id, name);
            }
        }

        Command::Encrypt { conn, ty, value } => {
            let plain = parse_plain(&value)?;
            let client = ClientBuilder::new(conn.client_config()?).build().await?;
            client.init().await?;

            let encrypted = client.encrypt(plain, ty).await?;
            println!("{}", serde_json::to_string_pretty(&encrypted)?);
        }

        Command::Call {
            conn,
            contract,
            signature,
            from,
            method,
            args,
        } => {
            let config = conn.client_config()?;
            let provider = Arc::new(RpcProvider::connect(&config.provider).await?);
            let contract = FheContract::from_human_readable(contract, [signature.as_str()], provider)?;
            let contract = match from {
                Some(from) => contract.connect(from),
                None => contract.connect_default().await?,
            };

            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            let outcome = contract.call_str(&method, &args).await?;
            match (outcome.returned(), outcome.tx_hash()) {
                (Some(values), _) => {
                    for value in values {
                        println!("{:?}", value);
                    }
                }
                (None, Some(hash)) => println!("[OK] Submitted {}", hash),
                (None, None) => {}
            }
        }

        Command::Decrypt {
            conn,
            contract,
            handle,
            private_key,
            timeout_secs,
        } => {
            let config = conn.client_config()?;
            let provider = RpcProvider::connect(&config.provider).await?;
            let chain_id = match config.chain_id {
                Some(id) => id,
                None => fhevm_client::NetworkProvider::chain_id(&provider).await?,
            };
            if !is_supported_network(chain_id) {
                tracing::warn!(chain_id, "Decrypting on a network outside the supported list");
            }

            let signer = PrivateKeySigner::from_str(&private_key)?;
            let user = signer.address();
            let decryptor = Decryptor::from_config(&config, chain_id, Arc::new(signer))?;

            let pending = decryptor.request_decryption(contract, handle, user);
            tracing::info!(%contract, %handle, %user, "Decryption requested");

            let result = tokio::time::timeout(Duration::from_secs(timeout_secs), pending.wait())
                .await
                .map_err(|_| anyhow::anyhow!("Decryption timed out after {}s", timeout_secs))?;

            match (result.value(), result.error()) {
                (Some(value), _) => println!("{}", value),
                (None, Some(error)) => anyhow::bail!("Decryption failed: {}", error),
                (None, None) => anyhow::bail!("Decryption did not complete"),
            }
        }
    }

    Ok(())
}
