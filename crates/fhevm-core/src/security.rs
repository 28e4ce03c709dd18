//! Input hygiene helpers

use rand::RngCore;

use crate::constants::MAX_INPUT_LEN;

/// Trim, strip angle brackets and cap the length of user-provided text
pub fn sanitize_input(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .take(MAX_INPUT_LEN)
        .collect()
}

/// 32 random bytes, hex-encoded
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
