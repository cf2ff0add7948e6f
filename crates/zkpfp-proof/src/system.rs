//! The `ProofSystem` trait: the seam between the protocol and whichever
//! proof backend is deployed.

use zkpfp_core::{ProofBundle, WalletAddress, ZkProof, IV_LEN, SYMMETRIC_KEY_LEN};

use crate::error::Result;

/// A backend that can prove and verify knowledge of the key material
/// behind a commitment.
///
/// `generate` runs on the owner's side with the secret key in hand and may
/// be slow (seconds); callers treat failure as a soft degrade to a
/// proof-less commitment. `verify` runs anywhere against published
/// material only and must never panic.
pub trait ProofSystem: Send + Sync {
    /// Produce a proof that the caller knows `(symmetric_key, iv)` hashing
    /// to the commitment, bound to `owner`.
    ///
    /// `public_signals[0]` of the returned bundle is the commitment (hex),
    /// `public_signals[1]` the owner identity.
    fn generate(
        &self,
        symmetric_key: &[u8; SYMMETRIC_KEY_LEN],
        iv: &[u8; IV_LEN],
        owner: &WalletAddress,
    ) -> Result<ProofBundle>;

    /// Check a proof against its public signals.
    ///
    /// Returns `false` for any malformed, mismatched, or forged input.
    fn verify(&self, proof: &ZkProof, public_signals: &[String]) -> bool;

    /// Convenience: verify a stored bundle.
    fn verify_bundle(&self, bundle: &ProofBundle) -> bool {
        self.verify(&bundle.proof, &bundle.public_signals)
    }
}
