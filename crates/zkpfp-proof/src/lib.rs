//! # zkPFP Proof
//!
//! Proof-of-key-knowledge for zkPFP commitments: a proof that the owner
//! knows the `(symmetric_key, iv)` pair behind a commitment, bound to a
//! wallet identity, without revealing the key.
//!
//! The [`ProofSystem`] trait is the seam. The shipped backend is
//! [`BindingProver`], a commitment-binding proof over a derived Ed25519
//! key; a SNARK backend can replace it without touching callers.
//!
//! Generation failure is always a soft failure upstream: asset creation
//! degrades to a proof-less commitment (`ProofAttachment::Absent`) rather
//! than aborting. Verification returns `bool` and never panics.

pub mod binding;
pub mod error;
pub mod system;

pub use binding::{BindingProver, VerificationKey, CURVE, PROTOCOL};
pub use error::{ProofError, Result};
pub use system::ProofSystem;
