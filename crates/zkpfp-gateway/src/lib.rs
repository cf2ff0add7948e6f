//! # zkPFP Gateway
//!
//! The server-side zkPFP protocol: asset registration, the per-platform
//! grant registry, consent session issuance, the credit ledger, and the
//! metered reveal.
//!
//! ## Overview
//!
//! [`Gateway`] is the single entry point, generic over a
//! [`zkpfp_store::Store`] backend and a [`zkpfp_proof::ProofSystem`]
//! prover. Each operation is an independent, stateless unit of work
//! against the shared store; no in-process session object exists.
//!
//! ## Key Operations
//!
//! - [`Gateway::create_asset`] - encrypt, attempt a proof, persist
//! - [`Gateway::toggle_grant`] - owner-signed grant switch
//! - [`Gateway::sign_nda`] - viewer-signed consent session (60-minute TTL)
//! - [`Gateway::topup`] - idempotent, chain-signature-deduplicated credit
//! - [`Gateway::reveal`] - API-key-authenticated, metered release of
//!   encrypted material (never plaintext)
//!
//! Time-sensitive operations have `_at(now)` variants for tests.

pub mod config;
pub mod error;
pub mod gateway;

pub use config::{GatewayConfig, DEFAULT_COMMAND_FRESHNESS_MS, DEFAULT_REVEAL_COST};
pub use error::{GatewayError, Result};
pub use gateway::{
    burn_message, toggle_message, CreatedAsset, Gateway, Reveal, RevealAudit, SignNdaRequest,
    TopupReceipt,
};
