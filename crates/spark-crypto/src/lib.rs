/// Spark message crypto.
///
/// Message bodies are encrypted at rest with a single process-wide symmetric
/// key (AES-256-GCM) and stored as `hex(iv):hex(ciphertext)` envelopes. The
/// key is explicit constructor state, not an ambient global, so tests can run
/// with distinct keys per case. There is no key rotation.
pub mod envelope;
pub mod keys;

pub use envelope::{CryptoError, MessageCipher};
