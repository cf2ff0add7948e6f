//! Error taxonomy for gateway operations.
//!
//! Every failure a caller can act on has its own variant; the remedy
//! differs per variant. `Expired` is deliberately distinct from
//! `Authorization`: an expired session is fixed by re-signing, a missing
//! grant is fixed by asking the owner for access.

use thiserror::Error;
use zkpfp_core::{CryptoError, UsdCents};
use zkpfp_store::StoreError;

/// Errors that can occur during gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or malformed request field. Terminal, non-retryable.
    #[error("validation error: {0}")]
    Validation(String),

    /// Bad API key or bad signature.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Grant inactive, consent missing, or account inactive.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Unknown asset, platform, or session.
    #[error("not found: {0}")]
    NotFound(String),

    /// Session or signed command past its validity window. Remedy is
    /// re-signing, not requesting access.
    #[error("expired: {0}")]
    Expired(String),

    /// Balance cannot cover the operation; carries what the caller needs
    /// to prompt a top-up.
    #[error("insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds {
        balance: UsdCents,
        required: UsdCents,
    },

    /// Duplicate payment signature.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Cryptographic failure (encryption, decryption authentication).
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Storage failure.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
