//! Validation layer: pure checks on values, addresses and configuration
//!
//! Every function here returns `false` (or an error with a reason) for bad input and
//! never panics.

use crate::constants::{MAX_BATCH_SIZE, SUPPORTED_CHAIN_IDS};
use crate::{ClientConfig, EncryptedType, Error, PlainValue};

/// Check that a tag names a type accepted for encryption
pub fn is_valid_encrypted_type(tag: &str) -> bool {
    tag.parse::<EncryptedType>()
        .map(|ty| ty.is_encryptable())
        .unwrap_or(false)
}

/// Check that a plaintext fits its declared type
///
/// `ebool` takes a boolean; `euint8/16/32/64` take an integer in
/// `[0, 2^n - 1]`. Every other type is rejected.
pub fn is_valid_value_for_type(value: &PlainValue, ty: EncryptedType) -> bool {
    if ty == EncryptedType::Ebool {
        return matches!(value, PlainValue::Bool(_));
    }

    let Some(max) = ty.max_value() else {
        return false;
    };

    match value {
        PlainValue::Integer(v) => *v >= 0 && *v <= max as i128,
        _ => false,
    }
}

/// `0x` followed by exactly 40 hex digits; checksum is not verified
pub fn is_valid_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(hex) => hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Contract address check; the error carries a human-readable reason
pub fn validate_contract_address(address: &str) -> crate::Result<()> {
    if address.is_empty() {
        return Err(Error::InvalidAddress("Address is required".to_string()));
    }
    if !is_valid_address(address) {
        return Err(Error::InvalidAddress("Invalid Ethereum address format".to_string()));
    }
    Ok(())
}

/// A config is usable when it names a provider
pub fn is_valid_config(config: &ClientConfig) -> bool {
    !config.provider.trim().is_empty()
}

pub fn is_supported_network(chain_id: u64) -> bool {
    SUPPORTED_CHAIN_IDS.contains(&chain_id)
}

/// `0x` followed by any number of hex digits
pub fn is_valid_hex_string(hex: &str) -> bool {
    match hex.strip_prefix("0x") {
        Some(rest) => rest.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Solidity-style `name(args...)`
pub fn is_valid_method_signature(signature: &str) -> bool {
    let Some(open) = signature.find('(') else {
        return false;
    };
    if !signature.ends_with(')') {
        return false;
    }

    let name = &signature[..open];
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Batch size check for bulk encryption
pub fn validate_value_array<T>(values: &[T]) -> Result<(), String> {
    if values.is_empty() {
        return Err("Array cannot be empty".to_string());
    }
    if values.len() > MAX_BATCH_SIZE {
        return Err(format!("Array too large (max {} items)", MAX_BATCH_SIZE));
    }
    Ok(())
}
