//! Share-link error taxonomy.
//!
//! Wrong passwords and tampered links both surface as
//! [`LinkError::AuthenticationFailed`]; callers cannot and must not tell them
//! apart.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("no data to encrypt")]
    EmptyPayload,

    #[error("payload too large: {len} bytes (maximum {max})", max = crate::compress::MAX_DECOMPRESSED_SIZE)]
    PayloadTooLarge { len: usize },

    #[error("link has no encrypted payload")]
    NoEncryptedPayload,

    #[error("link has no shared data")]
    NoPlainPayload,

    #[error("invalid link encoding: {0}")]
    MalformedEncoding(String),

    #[error("encrypted payload too short: {len} bytes (minimum {min})", min = crate::FRAME_HEADER_SIZE)]
    MalformedFrame { len: usize },

    #[error("wrong password or corrupted data")]
    AuthenticationFailed,

    #[error("decrypted payload is corrupt: {0}")]
    CorruptPayload(String),

    #[error("secure random number generator unavailable: {0}")]
    RandomnessUnavailable(String),

    #[error("cipher failure: {0}")]
    Cipher(String),

    #[error("compression failed: {0}")]
    Compression(#[source] std::io::Error),

    #[error("password prompt failed: {0}")]
    Prompt(#[source] std::io::Error),
}

impl LinkError {
    /// Errors that mean the environment, not the input, is broken.
    ///
    /// Encoding stops without producing any link when one of these occurs.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LinkError::RandomnessUnavailable(_) | LinkError::Cipher(_) | LinkError::Compression(_)
        )
    }

    /// Whether asking for another password might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LinkError::AuthenticationFailed)
    }
}
