//! FHE type tags

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Bit-width / semantic class of a plaintext prior to encryption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncryptedType {
    Ebool,
    Euint4,
    Euint8,
    Euint16,
    Euint32,
    Euint64,
    Euint128,
    Euint256,
    Eaddress,
}

impl EncryptedType {
    pub const ALL: [EncryptedType; 9] = [
        EncryptedType::Ebool,
        EncryptedType::Euint4,
        EncryptedType::Euint8,
        EncryptedType::Euint16,
        EncryptedType::Euint32,
        EncryptedType::Euint64,
        EncryptedType::Euint128,
        EncryptedType::Euint256,
        EncryptedType::Eaddress,
    ];

    /// Types the validation layer accepts for encryption
    pub const ENCRYPTABLE: [EncryptedType; 5] = [
        EncryptedType::Euint8,
        EncryptedType::Euint16,
        EncryptedType::Euint32,
        EncryptedType::Euint64,
        EncryptedType::Ebool,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptedType::Ebool => "ebool",
            EncryptedType::Euint4 => "euint4",
            EncryptedType::Euint8 => "euint8",
            EncryptedType::Euint16 => "euint16",
            EncryptedType::Euint32 => "euint32",
            EncryptedType::Euint64 => "euint64",
            EncryptedType::Euint128 => "euint128",
            EncryptedType::Euint256 => "euint256",
            EncryptedType::Eaddress => "eaddress",
        }
    }

    /// Plaintext width in bits
    pub fn bits(&self) -> u32 {
        match self {
            EncryptedType::Ebool => 1,
            EncryptedType::Euint4 => 4,
            EncryptedType::Euint8 => 8,
            EncryptedType::Euint16 => 16,
            EncryptedType::Euint32 => 32,
            EncryptedType::Euint64 => 64,
            EncryptedType::Euint128 => 128,
            EncryptedType::Euint256 => 256,
            EncryptedType::Eaddress => 160,
        }
    }

    pub fn is_encryptable(&self) -> bool {
        Self::ENCRYPTABLE.contains(self)
    }

    /// Largest admissible plaintext for the encryptable unsigned types
    pub fn max_value(&self) -> Option<u64> {
        match self {
            EncryptedType::Euint8 => Some(u8::MAX as u64),
            EncryptedType::Euint16 => Some(u16::MAX as u64),
            EncryptedType::Euint32 => Some(u32::MAX as u64),
            EncryptedType::Euint64 => Some(u64::MAX),
            _ => None,
        }
    }
}

impl fmt::Display for EncryptedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncryptedType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| Error::InvalidType(s.to_string()))
    }
}
