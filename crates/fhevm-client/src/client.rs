//! FHEVM client wrapper

use std::sync::Arc;

use alloy_primitives::{Address, Bytes};
use arc_swap::ArcSwap;
use tokio::sync::{broadcast, Mutex};

use fhevm_core::validation::{is_supported_network, is_valid_value_for_type, validate_value_array};
use fhevm_core::{
    ClientConfig, ClientPhase, ClientState, EncryptedData, EncryptedType, InputProof, PlainValue,
};

use crate::backend::{FheBackend, PlaceholderBackend};
use crate::error::{ClientError, Result};
use crate::events::{ClientEvent, EVENT_CHANNEL_CAPACITY};
use crate::provider::{NetworkProvider, RpcProvider};

/// Client holding a provider handle, a backend and a readiness state
///
/// State moves `Uninitialized -> Initializing -> Ready | Failed` exactly
/// once. Reads of the state are lock-free; only `init` writes it.
pub struct FhevmClient {
    config: ClientConfig,
    provider: Arc<dyn NetworkProvider>,
    backend: Arc<dyn FheBackend>,
    state: ArcSwap<ClientState>,
    init_lock: Mutex<()>,
    events: broadcast::Sender<ClientEvent>,
}

impl FhevmClient {
    pub fn new(
        config: ClientConfig,
        provider: Arc<dyn NetworkProvider>,
        backend: Arc<dyn FheBackend>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            provider,
            backend,
            state: ArcSwap::from_pointee(ClientState::uninitialized()),
            init_lock: Mutex::new(()),
            events,
        }
    }

    /// Perform one-time setup: verify the network and load the public key
    pub async fn init(&self) -> Result<()> {
        let _guard = self.init_lock.lock().await;

        match self.state.load().phase {
            ClientPhase::Ready => return Ok(()),
            ClientPhase::Failed => {
                return Err(ClientError::Initialization(
                    "client failed to initialize earlier; create a new instance".to_string(),
                ))
            }
            ClientPhase::Uninitialized | ClientPhase::Initializing => {}
        }

        self.set_phase(ClientPhase::Initializing, None, None);

        match self.connect().await {
            Ok((chain_id, public_key)) => {
                tracing::info!(
                    chain_id,
                    has_public_key = public_key.is_some(),
                    "FHEVM client initialized"
                );
                self.set_phase(ClientPhase::Ready, public_key, Some(chain_id));
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "FHEVM client initialization failed");
                self.set_phase(ClientPhase::Failed, None, None);
                let _ = self.events.send(ClientEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn connect(&self) -> Result<(u64, Option<Bytes>)> {
        let chain_id = self
            .provider
            .chain_id()
            .await
            .map_err(|e| ClientError::Initialization(format!("provider unreachable: {}", e)))?;

        if let Some(expected) = self.config.chain_id {
            if expected != chain_id {
                return Err(ClientError::Initialization(format!(
                    "chain id mismatch: config expects {}, provider reports {}",
                    expected, chain_id
                )));
            }
        }

        if !is_supported_network(chain_id) {
            tracing::warn!(chain_id, "Connected to a network outside the supported list");
        }

        let public_key = self
            .backend
            .load_public_key(chain_id)
            .await
            .map_err(|e| ClientError::Initialization(format!("public key fetch failed: {}", e)))?;

        Ok((chain_id, public_key))
    }

    fn set_phase(&self, phase: ClientPhase, public_key: Option<Bytes>, chain_id: Option<u64>) {
        self.state.store(Arc::new(ClientState {
            phase,
            public_key,
            chain_id,
        }));
        let _ = self.events.send(ClientEvent::Phase(phase));
    }

    pub fn is_ready(&self) -> bool {
        self.state.load().is_ready()
    }

    pub fn phase(&self) -> ClientPhase {
        self.state.load().phase
    }

    /// Snapshot of the current state
    pub fn state(&self) -> ClientState {
        self.state.load().as_ref().clone()
    }

    pub fn public_key(&self) -> Option<Bytes> {
        self.state.load().public_key.clone()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn provider(&self) -> Arc<dyn NetworkProvider> {
        self.provider.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Validate and encrypt a plaintext
    pub async fn encrypt(&self, value: impl Into<PlainValue>, ty: EncryptedType) -> Result<EncryptedData> {
        if !self.is_ready() {
            return Err(ClientError::NotReady);
        }

        let value = value.into();
        let outcome = if is_valid_value_for_type(&value, ty) {
            self.backend.encrypt(&value, ty).await
        } else {
            Err(ClientError::InvalidValue {
                value: value.to_string(),
                ty,
            })
        };

        match outcome {
            Ok(encrypted) => {
                tracing::debug!(ty = %ty, bytes = encrypted.payload().len(), "Value encrypted");
                let _ = self.events.send(ClientEvent::Encrypted { ty });
                Ok(encrypted)
            }
            Err(e) => {
                tracing::warn!(ty = %ty, error = %e, "Encryption failed");
                let _ = self.events.send(ClientEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Encrypt several values of one type; the whole batch is validated first
    pub async fn encrypt_batch<V>(&self, values: &[V], ty: EncryptedType) -> Result<Vec<EncryptedData>>
    where
        V: Into<PlainValue> + Copy,
    {
        validate_value_array(values).map_err(ClientError::InvalidBatch)?;

        let mut out = Vec::with_capacity(values.len());
        for value in values {
            out.push(self.encrypt(*value, ty).await?);
        }
        Ok(out)
    }

    pub async fn encrypt_u8(&self, value: u8) -> Result<EncryptedData> {
        self.encrypt(value, EncryptedType::Euint8).await
    }

    pub async fn encrypt_u32(&self, value: u32) -> Result<EncryptedData> {
        self.encrypt(value, EncryptedType::Euint32).await
    }

    pub async fn encrypt_bool(&self, value: bool) -> Result<EncryptedData> {
        self.encrypt(value, EncryptedType::Ebool).await
    }

    /// Bind an encrypted payload to a contract and submitting user
    pub async fn create_input_proof(
        &self,
        encrypted: &EncryptedData,
        contract: Address,
        user: Address,
    ) -> Result<InputProof> {
        if !self.is_ready() {
            return Err(ClientError::NotReady);
        }
        self.backend.input_proof(encrypted, contract, user).await
    }
}

/// Builder for FhevmClient
pub struct ClientBuilder {
    config: ClientConfig,
    provider: Option<Arc<dyn NetworkProvider>>,
    backend: Option<Arc<dyn FheBackend>>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            provider: None,
            backend: None,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn NetworkProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn FheBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Build the client, connecting an RPC provider from the config if none was given
    pub async fn build(self) -> Result<FhevmClient> {
        if !fhevm_core::validation::is_valid_config(&self.config) && self.provider.is_none() {
            return Err(fhevm_core::Error::InvalidConfig("provider must not be empty".to_string()).into());
        }

        let provider = match self.provider {
            Some(p) => p,
            None => Arc::new(RpcProvider::connect(&self.config.provider).await?),
        };
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(PlaceholderBackend::new()));

        Ok(FhevmClient::new(self.config, provider, backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use alloy_rpc_types::TransactionRequest;
    use async_trait::async_trait;

    struct StaticProvider {
        chain_id: Option<u64>,
    }

    #[async_trait]
    impl NetworkProvider for StaticProvider {
        async fn chain_id(&self) -> Result<u64> {
            self.chain_id
                .ok_or_else(|| ClientError::Provider("connection refused".into()))
        }

        async fn accounts(&self) -> Result<Vec<Address>> {
            Ok(vec![])
        }

        async fn call(&self, _tx: TransactionRequest) -> Result<Bytes> {
            Ok(Bytes::new())
        }

        async fn send_transaction(&self, _tx: TransactionRequest) -> Result<B256> {
            Ok(B256::ZERO)
        }
    }

    fn client_on(chain_id: Option<u64>, config: ClientConfig) -> FhevmClient {
        FhevmClient::new(
            config,
            Arc::new(StaticProvider { chain_id }),
            Arc::new(PlaceholderBackend::new().with_public_key(vec![7u8; 8])),
        )
    }

    fn sepolia_client() -> FhevmClient {
        client_on(Some(11_155_111), ClientConfig::default())
    }

    #[tokio::test]
    async fn test_encrypt_before_init_is_not_ready() {
        let client = sepolia_client();
        assert!(matches!(
            client.encrypt(10u32, EncryptedType::Euint32).await,
            Err(ClientError::NotReady)
        ));
        assert!(client.public_key().is_none());
    }

    #[tokio::test]
    async fn test_init_then_encrypt() {
        let client = sepolia_client();
        client.init().await.unwrap();
        assert!(client.is_ready());
        assert_eq!(client.state().chain_id, Some(11_155_111));
        assert_eq!(client.public_key().unwrap().len(), 8);

        let data = client.encrypt(10u32, EncryptedType::Euint32).await.unwrap();
        assert_eq!(data.encrypted_type(), EncryptedType::Euint32);
        assert_eq!(data.payload().as_ref(), b"encrypted_10_euint32");
    }

    #[tokio::test]
    async fn test_out_of_range_value_rejected() {
        let client = sepolia_client();
        client.init().await.unwrap();

        let err = client.encrypt(300u32, EncryptedType::Euint8).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidValue { ty: EncryptedType::Euint8, .. }));

        assert!(client.encrypt(1u8, EncryptedType::Ebool).await.is_err());
        assert!(client.encrypt(true, EncryptedType::Ebool).await.is_ok());
        assert!(client.encrypt(255u8, EncryptedType::Euint8).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_value_emits_error_event() {
        let client = sepolia_client();
        client.init().await.unwrap();
        let mut events = client.subscribe();

        assert!(client.encrypt(300u32, EncryptedType::Euint8).await.is_err());
        match events.try_recv().unwrap() {
            ClientEvent::Error(message) => assert!(message.contains("300")),
            other => panic!("expected error event, got {:?}", other),
        }
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_init_failure_is_terminal() {
        let client = client_on(None, ClientConfig::new("http://unreachable"));
        assert!(matches!(client.init().await, Err(ClientError::Initialization(_))));
        assert_eq!(client.phase(), ClientPhase::Failed);

        // No automatic retry on the same instance
        assert!(matches!(client.init().await, Err(ClientError::Initialization(_))));
        assert!(matches!(
            client.encrypt(1u8, EncryptedType::Euint8).await,
            Err(ClientError::NotReady)
        ));
    }

    #[tokio::test]
    async fn test_chain_id_mismatch_fails_init() {
        let client = client_on(Some(1), ClientConfig::default());
        let err = client.init().await.unwrap_err();
        assert!(err.to_string().contains("chain id mismatch"));
        assert!(!client.is_ready());
    }

    #[tokio::test]
    async fn test_init_is_idempotent_once_ready() {
        let client = sepolia_client();
        client.init().await.unwrap();
        client.init().await.unwrap();
        assert!(client.is_ready());
    }

    #[tokio::test]
    async fn test_concurrent_init_single_transition() {
        let client = Arc::new(sepolia_client());
        let mut events = client.subscribe();

        let a = tokio::spawn({
            let c = client.clone();
            async move { c.init().await }
        });
        let b = tokio::spawn({
            let c = client.clone();
            async move { c.init().await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let mut ready_events = 0;
        while let Ok(event) = events.try_recv() {
            if event == ClientEvent::Phase(ClientPhase::Ready) {
                ready_events += 1;
            }
        }
        assert_eq!(ready_events, 1);
    }

    #[tokio::test]
    async fn test_input_proof_requires_ready() {
        let client = sepolia_client();
        let data = EncryptedData::new(b"x".to_vec(), EncryptedType::Euint8);
        let contract = Address::repeat_byte(0xaa);
        let user = Address::repeat_byte(0xbb);

        assert!(matches!(
            client.create_input_proof(&data, contract, user).await,
            Err(ClientError::NotReady)
        ));

        client.init().await.unwrap();
        let proof = client.create_input_proof(&data, contract, user).await.unwrap();
        assert_eq!(proof.contract_address, contract);
        assert_eq!(proof.user_address, user);
    }

    #[tokio::test]
    async fn test_encrypt_batch() {
        let client = sepolia_client();
        client.init().await.unwrap();

        let batch = client.encrypt_batch(&[1u8, 2, 3], EncryptedType::Euint8).await.unwrap();
        assert_eq!(batch.len(), 3);

        let empty: [u8; 0] = [];
        assert!(matches!(
            client.encrypt_batch(&empty, EncryptedType::Euint8).await,
            Err(ClientError::InvalidBatch(_))
        ));
        assert!(client.encrypt_batch(&[1u32, 256], EncryptedType::Euint8).await.is_err());
    }

    #[tokio::test]
    async fn test_events_for_encrypt() {
        let client = sepolia_client();
        client.init().await.unwrap();
        let mut events = client.subscribe();

        client.encrypt_bool(true).await.unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            ClientEvent::Encrypted { ty: EncryptedType::Ebool }
        );
    }
}
