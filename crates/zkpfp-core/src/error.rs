//! Error types for zkPFP core.

use thiserror::Error;

/// Errors from identifier and key handling.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Errors from the commitment encryption pipeline.
///
/// An AEAD authentication failure during decryption means tampered data or
/// a wrong owner identity; both surface as [`CryptoError::Decryption`] and
/// never as silently wrong plaintext.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: authentication tag mismatch")]
    Decryption,

    #[error("malformed {field}: {reason}")]
    Malformed {
        field: &'static str,
        reason: String,
    },

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,
}

impl From<CoreError> for CryptoError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidSignature => CryptoError::InvalidSignature,
            CoreError::InvalidPublicKey => CryptoError::InvalidPublicKey,
            CoreError::InvalidAddress(reason) => CryptoError::Malformed {
                field: "wallet address",
                reason,
            },
            CoreError::Encoding(reason) => CryptoError::Malformed {
                field: "encoding",
                reason,
            },
        }
    }
}
