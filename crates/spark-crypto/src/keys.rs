use aes_gcm::aead::OsRng;
use aes_gcm::aead::rand_core::RngCore;
use anyhow::Result;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

/// Generate a random 256-bit message key.
pub fn generate_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    key
}

/// Encode a key to base64 for configuration/sharing.
pub fn key_to_base64(key: &[u8; 32]) -> String {
    BASE64.encode(key)
}

/// Decode a base64 key. Anything that is not exactly 32 decoded bytes is
/// rejected — the process must refuse to start on a malformed secret.
pub fn key_from_base64(encoded: &str) -> Result<[u8; 32]> {
    let bytes = BASE64.decode(encoded.trim())?;
    let key: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("message key must be exactly 32 bytes"))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_roundtrip() {
        let key = generate_key();
        assert_eq!(key_from_base64(&key_to_base64(&key)).unwrap(), key);
    }

    #[test]
    fn wrong_length_rejected() {
        assert!(key_from_base64(&BASE64.encode([0u8; 16])).is_err());
        assert!(key_from_base64("!!!not base64!!!").is_err());
    }
}
