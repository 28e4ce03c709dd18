//! Observable bindings over the client
//!
//! An [`FhevmContext`] owns one client for an application scope. Bindings
//! created from it expose the progress of a single kind of operation as an
//! [`OperationState`] snapshot and a `watch` subscription.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, U256};
use serde::Serialize;
use tokio::sync::watch;

use fhevm_core::{DecryptedValue, DecryptionStatus, EncryptedData, EncryptedType, PlainValue};

use crate::client::FhevmClient;
use crate::contract::{CallOutcome, FheContract};
use crate::decryption::Decryptor;
use crate::error::{ClientError, Result};

/// Snapshot of a binding's last operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationState<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl<T> Default for OperationState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }
}

/// Readiness of a context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextStatus {
    pub is_ready: bool,
    pub error: Option<String>,
    pub chain_id: Option<u64>,
}

/// Scoped owner of a client
pub struct FhevmContext {
    client: Arc<FhevmClient>,
    status: watch::Sender<ContextStatus>,
    disposed: AtomicBool,
}

impl FhevmContext {
    pub fn new(client: Arc<FhevmClient>) -> Self {
        let (status, _) = watch::channel(ContextStatus::default());
        Self {
            client,
            status,
            disposed: AtomicBool::new(false),
        }
    }

    /// Initialize the client, recording readiness or the failure message
    pub async fn start(&self) -> Result<()> {
        self.ensure_live()?;

        match self.client.init().await {
            Ok(()) => {
                let chain_id = self.client.state().chain_id;
                self.status.send_replace(ContextStatus {
                    is_ready: true,
                    error: None,
                    chain_id,
                });
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "FHEVM initialization error");
                self.status.send_replace(ContextStatus {
                    is_ready: false,
                    error: Some(e.to_string()),
                    chain_id: None,
                });
                Err(e)
            }
        }
    }

    /// End the context; later binding construction fails with `Disposed`
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.status.send_replace(ContextStatus::default());
            tracing::debug!("FHEVM context disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> ContextStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ContextStatus> {
        self.status.subscribe()
    }

    pub fn client(&self) -> Result<Arc<FhevmClient>> {
        self.ensure_live()?;
        Ok(self.client.clone())
    }

    pub fn encrypt_binding(&self) -> Result<EncryptBinding> {
        Ok(EncryptBinding {
            client: self.client()?,
            state: watch::channel(OperationState::default()).0,
        })
    }

    pub fn decrypt_binding(&self, decryptor: Decryptor) -> Result<DecryptBinding> {
        self.ensure_live()?;
        Ok(DecryptBinding {
            decryptor,
            state: watch::channel(OperationState::default()).0,
        })
    }

    pub fn contract_binding(&self, contract: FheContract) -> Result<ContractBinding> {
        self.ensure_live()?;
        Ok(ContractBinding {
            contract,
            state: watch::channel(OperationState::default()).0,
        })
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(ClientError::Disposed);
        }
        Ok(())
    }
}

fn begin<T>(state: &watch::Sender<OperationState<T>>) {
    state.send_modify(|s| {
        s.is_loading = true;
        s.error = None;
    });
}

fn finish<T: Clone>(state: &watch::Sender<OperationState<T>>, outcome: &Result<T>) {
    state.send_modify(|s| {
        s.is_loading = false;
        match outcome {
            Ok(data) => s.data = Some(data.clone()),
            Err(e) => s.error = Some(e.to_string()),
        }
    });
}

/// Encryption progress
pub struct EncryptBinding {
    client: Arc<FhevmClient>,
    state: watch::Sender<OperationState<EncryptedData>>,
}

impl EncryptBinding {
    pub async fn encrypt(&self, value: impl Into<PlainValue>, ty: EncryptedType) -> Result<EncryptedData> {
        if !self.client.is_ready() {
            let err = ClientError::NotReady;
            self.state.send_modify(|s| s.error = Some(err.to_string()));
            return Err(err);
        }

        begin(&self.state);
        let outcome = self.client.encrypt(value, ty).await;
        finish(&self.state, &outcome);
        outcome
    }

    pub fn is_ready(&self) -> bool {
        self.client.is_ready()
    }

    pub fn state(&self) -> OperationState<EncryptedData> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OperationState<EncryptedData>> {
        self.state.subscribe()
    }

    pub fn reset(&self) {
        self.state.send_replace(OperationState::default());
    }
}

/// Decryption progress
pub struct DecryptBinding {
    decryptor: Decryptor,
    state: watch::Sender<OperationState<DecryptedValue>>,
}

impl DecryptBinding {
    /// Request a decryption and wait for the Gateway's answer
    pub async fn decrypt(&self, contract: Address, handle: U256, user: Address) -> Result<DecryptedValue> {
        begin(&self.state);

        let result = self
            .decryptor
            .request_decryption(contract, handle, user)
            .wait()
            .await;

        let outcome = match (result.status(), result.value()) {
            (DecryptionStatus::Success, Some(value)) => Ok(value),
            _ => Err(ClientError::DecryptionFailed(
                result.error().unwrap_or("decryption did not complete").to_string(),
            )),
        };
        finish(&self.state, &outcome);
        outcome
    }

    pub fn state(&self) -> OperationState<DecryptedValue> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OperationState<DecryptedValue>> {
        self.state.subscribe()
    }

    pub fn reset(&self) {
        self.state.send_replace(OperationState::default());
    }
}

/// Contract call progress
pub struct ContractBinding {
    contract: FheContract,
    state: watch::Sender<OperationState<CallOutcome>>,
}

impl ContractBinding {
    pub async fn call(&self, method: &str, args: &[DynSolValue]) -> Result<CallOutcome> {
        begin(&self.state);
        let outcome = self.contract.call(method, args).await;
        finish(&self.state, &outcome);
        outcome
    }

    pub fn contract(&self) -> &FheContract {
        &self.contract
    }

    pub fn state(&self) -> OperationState<CallOutcome> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OperationState<CallOutcome>> {
        self.state.subscribe()
    }

    pub fn reset(&self) {
        self.state.send_replace(OperationState::default());
    }
}
