//! Client state-change notifications

use fhevm_core::{ClientPhase, EncryptedType};

/// Events broadcast by [`crate::FhevmClient`] to its subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Lifecycle phase changed
    Phase(ClientPhase),
    /// A value was encrypted
    Encrypted { ty: EncryptedType },
    /// An operation failed; carries the display message
    Error(String),
}

/// Subscriber queue depth; slow subscribers observe `Lagged`
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
