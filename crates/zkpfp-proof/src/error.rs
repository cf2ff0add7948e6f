//! Error types for proof generation.
//!
//! Verification has no error type on purpose: it answers with `bool` and
//! never throws, so callers can render a definite invalid state.

use thiserror::Error;

/// Errors that can occur while generating a proof.
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("proving key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("proof serialization failed: {0}")]
    Serialization(String),

    #[error("verification key error: {0}")]
    VerificationKey(String),

    #[error("proof backend unavailable: {0}")]
    Unavailable(String),
}

/// Result type for proof operations.
pub type Result<T> = std::result::Result<T, ProofError>;
