use spark_crypto::CryptoError;
use thiserror::Error;

/// Failure kinds surfaced by the match engine and chat service.
///
/// Gateway and crypto failures carry their cause and are never retried here;
/// retries are the caller's responsibility. Real-time publish failures are
/// not represented at all — fan-out is fire-and-forget once the write is
/// confirmed.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Rejected before touching storage (missing/equal ids, empty body).
    #[error("{0}")]
    Validation(String),

    /// The directed like already exists.
    #[error("you already liked this user")]
    AlreadyLiked,

    /// Unlike on an absent like, or a room/match lookup miss.
    #[error("not found")]
    NotFound,

    /// Message could not be encrypted or decrypted. Fatal on writes — a
    /// body that cannot be encrypted is never stored as plaintext.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A persistence call failed. Surfaced as-is, never swallowed.
    #[error("persistence gateway failed: {0}")]
    Gateway(#[from] anyhow::Error),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
