use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};
use thiserror::Error;

/// AES-256-GCM uses a 96-bit IV.
const IV_LEN: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// The envelope does not split into exactly two `:`-delimited hex
    /// fields with a well-formed IV.
    #[error("malformed ciphertext envelope")]
    MalformedEnvelope,

    /// The cipher rejected the ciphertext/IV/key combination.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Fatal on the write path: a message that cannot be encrypted is never
    /// stored in a plaintext fallback.
    #[error("encryption failed")]
    EncryptionFailed,
}

/// Stateless codec over a fixed 256-bit key, held for the process lifetime.
#[derive(Clone)]
pub struct MessageCipher {
    key: [u8; 32],
}

impl MessageCipher {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Encrypt a plaintext into a `hex(iv):hex(ciphertext)` envelope.
    ///
    /// A fresh random IV is drawn per call, so encrypting the same plaintext
    /// twice never yields the same envelope — equal messages are not
    /// revealed by ciphertext equality.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CryptoError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));

        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        Ok(format!("{}:{}", hex::encode(iv), hex::encode(ciphertext)))
    }

    /// Decrypt an envelope back to the plaintext bytes.
    pub fn decrypt(&self, envelope: &str) -> Result<Vec<u8>, CryptoError> {
        let (iv_hex, ct_hex) = split_envelope(envelope)?;

        let iv = hex::decode(iv_hex).map_err(|_| CryptoError::MalformedEnvelope)?;
        if iv.len() != IV_LEN {
            return Err(CryptoError::MalformedEnvelope);
        }
        let ciphertext = hex::decode(ct_hex).map_err(|_| CryptoError::MalformedEnvelope)?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

fn split_envelope(envelope: &str) -> Result<(&str, &str), CryptoError> {
    let mut parts = envelope.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(iv), Some(ct), None) if !iv.is_empty() && !ct.is_empty() => Ok((iv, ct)),
        _ => Err(CryptoError::MalformedEnvelope),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_key;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let cipher = MessageCipher::new(generate_key());
        let message = b"hello from spark";

        let envelope = cipher.encrypt(message).unwrap();
        assert!(envelope.contains(':'));

        let decrypted = cipher.decrypt(&envelope).unwrap();
        assert_eq!(decrypted, message);
    }

    #[test]
    fn fresh_iv_per_call() {
        let cipher = MessageCipher::new(generate_key());
        let a = cipher.encrypt(b"same message").unwrap();
        let b = cipher.encrypt(b"same message").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails() {
        let cipher1 = MessageCipher::new(generate_key());
        let cipher2 = MessageCipher::new(generate_key());

        let envelope = cipher1.encrypt(b"secret").unwrap();
        assert_eq!(cipher2.decrypt(&envelope), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let cipher = MessageCipher::new(generate_key());
        let envelope = cipher.encrypt(b"payload").unwrap();

        // Flip the last hex digit of the ciphertext half
        let mut tampered = envelope.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });

        assert_eq!(cipher.decrypt(&tampered), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn malformed_envelopes_rejected() {
        let cipher = MessageCipher::new(generate_key());

        for bad in [
            "",
            "nocolon",
            "a:b:c",
            ":beef",
            "beef:",
            "not-hex:beef",
            "beef:not-hex",
            // Valid hex but IV is not 12 bytes
            "beef:cafecafecafe",
        ] {
            assert_eq!(
                cipher.decrypt(bad),
                Err(CryptoError::MalformedEnvelope),
                "expected malformed: {bad:?}"
            );
        }
    }

    #[test]
    fn roundtrip_arbitrary_bytes() {
        let cipher = MessageCipher::new(generate_key());
        let message: Vec<u8> = (0..=255).collect();

        let envelope = cipher.encrypt(&message).unwrap();
        assert_eq!(cipher.decrypt(&envelope).unwrap(), message);
    }
}
