//! # zkPFP Core
//!
//! Core primitives for the zkPFP access-control and settlement protocol:
//!
//! - **Identifiers and records**: strongly-typed ids, the five persistent
//!   record families (assets, grants, sessions, platform accounts, ledger
//!   entries), and integer-cent money.
//! - **Commitment encryptor**: AES-256-GCM content encryption with an
//!   identity-derived key-wrapping step and a SHA-256 commitment over the
//!   secret key material.
//! - **NDA canonicalization**: deterministic template population and the
//!   exact consent message viewers sign.
//!
//! The commitment is `SHA256(symmetric_key ‖ iv)`: a public fingerprint of
//! the key material, independent of the ciphertext bytes. The encryptor is
//! *not* the confidentiality boundary (the wrapping key derives from a
//! public identity); the reveal gateway is.

pub mod crypto;
pub mod encrypt;
pub mod error;
pub mod nda;
pub mod types;

pub use crypto::{
    sha256_hex, Ed25519PublicKey, Ed25519Signature, Ed25519Verifier, Keypair, Sha256Hash,
    SignatureVerifier, WalletAddress,
};
pub use encrypt::{
    commitment, decrypt_image, encrypt_image, encrypt_image_with, EncryptedImage, ProgressFn,
    IV_LEN, KEY_DERIVATION_DOMAIN, SYMMETRIC_KEY_LEN,
};
pub use error::{CoreError, CryptoError};
pub use nda::{consent_message, NdaTemplate, PopulatedNda, DEFAULT_NDA_TEMPLATE};
pub use types::{
    AccessGrant, AccessSession, AssetId, CreditTransaction, EncryptedAsset, PlatformAccount,
    PlatformId, ProofAttachment, ProofBundle, SessionId, TransactionType, UsdCents, ZkProof,
    SESSION_TTL_MS,
};
