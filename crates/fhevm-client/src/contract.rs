//! Contract interaction helper
//!
//! Thin pass-through around a provider: encode, send, decode. No retry,
//! batching or nonce management happens here.

use std::sync::Arc;

use alloy_dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy_json_abi::{Function, JsonAbi, StateMutability};
use alloy_primitives::{Address, B256};
use alloy_rpc_types::{TransactionInput, TransactionRequest};

use fhevm_core::EncryptedData;

use crate::error::{ClientError, Result};
use crate::provider::NetworkProvider;

/// What a contract call produced
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// Decoded outputs of a view/pure call
    Returned(Vec<DynSolValue>),
    /// Hash of a submitted transaction
    Submitted(B256),
}

impl CallOutcome {
    pub fn returned(&self) -> Option<&[DynSolValue]> {
        match self {
            CallOutcome::Returned(values) => Some(values),
            CallOutcome::Submitted(_) => None,
        }
    }

    pub fn tx_hash(&self) -> Option<B256> {
        match self {
            CallOutcome::Submitted(hash) => Some(*hash),
            CallOutcome::Returned(_) => None,
        }
    }
}

/// Contract bound to an address, an ABI and a provider
#[derive(Clone)]
pub struct FheContract {
    address: Address,
    abi: Arc<JsonAbi>,
    provider: Arc<dyn NetworkProvider>,
    from: Option<Address>,
}

impl FheContract {
    pub fn new(address: Address, abi: JsonAbi, provider: Arc<dyn NetworkProvider>) -> Self {
        Self {
            address,
            abi: Arc::new(abi),
            provider,
            from: None,
        }
    }

    /// Bind from a JSON ABI document
    pub fn from_json(address: Address, abi_json: &str, provider: Arc<dyn NetworkProvider>) -> Result<Self> {
        let abi: JsonAbi = serde_json::from_str(abi_json)?;
        Ok(Self::new(address, abi, provider))
    }

    /// Bind from human-readable signatures, e.g. `function add(uint8 a, bytes b) view returns (uint8)`
    pub fn from_human_readable<'a>(
        address: Address,
        signatures: impl IntoIterator<Item = &'a str>,
        provider: Arc<dyn NetworkProvider>,
    ) -> Result<Self> {
        let abi = JsonAbi::parse(signatures).map_err(|e| ClientError::Contract(e.to_string()))?;
        Ok(Self::new(address, abi, provider))
    }

    /// Send transactions from this account
    pub fn connect(mut self, sender: Address) -> Self {
        self.from = Some(sender);
        self
    }

    /// Send from the provider's first account unless a sender is already set
    pub async fn connect_default(self) -> Result<Self> {
        if self.from.is_some() {
            return Ok(self);
        }
        let first = self.provider.accounts().await?.into_iter().next();
        match first {
            Some(sender) => Ok(self.connect(sender)),
            None => Err(ClientError::Contract("Provider has no accounts".to_string())),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    pub fn sender(&self) -> Option<Address> {
        self.from
    }

    fn resolve(&self, method: &str, arity: usize) -> Result<&Function> {
        let overloads = self
            .abi
            .function(method)
            .ok_or_else(|| ClientError::Contract(format!("Unknown method: {}", method)))?;

        overloads
            .iter()
            .find(|f| f.inputs.len() == arity)
            .ok_or_else(|| {
                ClientError::Contract(format!(
                    "No overload of {} takes {} argument(s)",
                    method, arity
                ))
            })
    }

    /// Invoke `method` with typed arguments
    ///
    /// View and pure functions go through `eth_call` and return decoded
    /// outputs; everything else is submitted as a transaction.
    pub async fn call(&self, method: &str, args: &[DynSolValue]) -> Result<CallOutcome> {
        let function = self.resolve(method, args.len())?;
        let input = function
            .abi_encode_input(args)
            .map_err(|e| ClientError::Contract(format!("Failed to encode {}: {}", method, e)))?;

        let mut tx = TransactionRequest::default()
            .to(self.address)
            .input(TransactionInput::new(input.into()));
        if let Some(from) = self.from {
            tx = tx.from(from);
        }

        match function.state_mutability {
            StateMutability::View | StateMutability::Pure => {
                let output = self.provider.call(tx).await?;
                let values = function.abi_decode_output(&output).map_err(|e| {
                    ClientError::Contract(format!("Failed to decode {} output: {}", method, e))
                })?;
                Ok(CallOutcome::Returned(values))
            }
            StateMutability::NonPayable | StateMutability::Payable => {
                let hash = self.provider.send_transaction(tx).await?;
                tracing::info!(
                    contract = %self.address,
                    method = method,
                    tx_hash = %hash,
                    "Contract transaction submitted"
                );
                Ok(CallOutcome::Submitted(hash))
            }
        }
    }

    /// Invoke `method` with string arguments coerced by the ABI parameter types
    pub async fn call_str(&self, method: &str, args: &[&str]) -> Result<CallOutcome> {
        let function = self.resolve(method, args.len())?;
        let values = function
            .inputs
            .iter()
            .zip(args)
            .map(|(param, raw)| {
                let ty = param
                    .resolve()
                    .map_err(|e| ClientError::Contract(e.to_string()))?;
                ty.coerce_str(raw).map_err(|e| {
                    ClientError::Contract(format!("Argument {:?} is not a valid {}: {}", raw, ty.sol_type_name(), e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.call(method, &values).await
    }
}

/// Turn an encrypted payload into a `bytes` argument
pub fn encrypted_arg(encrypted: EncryptedData) -> DynSolValue {
    DynSolValue::Bytes(encrypted.into_payload().to_vec())
}
