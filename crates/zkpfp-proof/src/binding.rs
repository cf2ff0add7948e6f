//! The shipped proof backend: a commitment-binding proof over a derived
//! Ed25519 key.
//!
//! The proving key seed is `SHA256(domain ‖ key ‖ iv)`. Deriving it
//! requires the same secret material that forms the commitment, so a valid
//! signature over the (commitment, identity) transcript demonstrates
//! knowledge of that material without revealing it. The proof publishes
//! only the derived public key and the signature.
//!
//! A SNARK backend can replace this behind the same [`ProofSystem`] trait;
//! the wire form (`protocol`/`curve` + JSON body + public signals) is
//! backend-agnostic.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use zkpfp_core::{
    commitment, ProofBundle, WalletAddress, ZkProof, IV_LEN, SYMMETRIC_KEY_LEN,
};

use crate::error::{ProofError, Result};
use crate::system::ProofSystem;

/// Protocol identifier carried in every proof this backend emits.
pub const PROTOCOL: &str = "zkpfp-binding-v1";

/// Curve identifier.
pub const CURVE: &str = "ed25519";

/// Domain separator for the proving-key seed derivation.
const PROVING_KEY_DOMAIN: &[u8] = b"zkpfp-binding-proving-key";

/// The published verification key: pins the protocol and curve a deployment
/// accepts. Distributed as JSON alongside client artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationKey {
    pub protocol: String,
    pub curve: String,
}

impl VerificationKey {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| ProofError::VerificationKey(e.to_string()))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("verification key serializes")
    }
}

impl Default for VerificationKey {
    fn default() -> Self {
        Self {
            protocol: PROTOCOL.to_string(),
            curve: CURVE.to_string(),
        }
    }
}

/// Serialized body of a binding proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BindingBody {
    /// Base58 Ed25519 public key derived from the secret material.
    binding_key: String,
    /// Base58 signature over the transcript.
    signature: String,
}

/// The commitment-binding prover/verifier.
pub struct BindingProver {
    vk: VerificationKey,
}

impl BindingProver {
    pub fn new() -> Self {
        Self {
            vk: VerificationKey::default(),
        }
    }

    /// Use an explicitly distributed verification key.
    pub fn with_verification_key(vk: VerificationKey) -> Self {
        Self { vk }
    }

    fn transcript(commitment_hex: &str, identity: &str) -> Vec<u8> {
        format!("{PROTOCOL}\ncommitment:{commitment_hex}\nidentity:{identity}").into_bytes()
    }

    fn derive_signing_key(
        symmetric_key: &[u8; SYMMETRIC_KEY_LEN],
        iv: &[u8; IV_LEN],
    ) -> SigningKey {
        let mut hasher = Sha256::new();
        hasher.update(PROVING_KEY_DOMAIN);
        hasher.update(symmetric_key);
        hasher.update(iv);
        let seed: [u8; 32] = hasher.finalize().into();
        SigningKey::from_bytes(&seed)
    }
}

impl Default for BindingProver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProofSystem for BindingProver {
    fn generate(
        &self,
        symmetric_key: &[u8; SYMMETRIC_KEY_LEN],
        iv: &[u8; IV_LEN],
        owner: &WalletAddress,
    ) -> Result<ProofBundle> {
        let commitment_hex = commitment(symmetric_key, iv).to_hex();
        let signing_key = Self::derive_signing_key(symmetric_key, iv);

        let transcript = Self::transcript(&commitment_hex, owner.as_str());
        let signature = signing_key.sign(&transcript);

        let body = BindingBody {
            binding_key: bs58::encode(signing_key.verifying_key().to_bytes()).into_string(),
            signature: bs58::encode(signature.to_bytes()).into_string(),
        };
        let body = serde_json::to_value(&body)
            .map_err(|e| ProofError::Serialization(e.to_string()))?;

        Ok(ProofBundle {
            proof: ZkProof {
                protocol: self.vk.protocol.clone(),
                curve: self.vk.curve.clone(),
                body,
            },
            public_signals: vec![commitment_hex, owner.as_str().to_string()],
        })
    }

    fn verify(&self, proof: &ZkProof, public_signals: &[String]) -> bool {
        if proof.protocol != self.vk.protocol || proof.curve != self.vk.curve {
            return false;
        }
        let [commitment_hex, identity] = public_signals else {
            return false;
        };

        let Ok(body) = serde_json::from_value::<BindingBody>(proof.body.clone()) else {
            return false;
        };
        let Ok(key_bytes) = bs58::decode(&body.binding_key).into_vec() else {
            return false;
        };
        let Ok(key_bytes) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(sig_bytes) = bs58::decode(&body.signature).into_vec() else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(sig_bytes.as_slice()) else {
            return false;
        };

        let transcript = Self::transcript(commitment_hex, identity);
        verifying_key
            .verify(&transcript, &Signature::from_bytes(&sig_bytes))
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    fn material() -> ([u8; SYMMETRIC_KEY_LEN], [u8; IV_LEN]) {
        let mut rng = rand::thread_rng();
        let mut key = [0u8; SYMMETRIC_KEY_LEN];
        rng.fill_bytes(&mut key);
        let mut iv = [0u8; IV_LEN];
        rng.fill_bytes(&mut iv);
        (key, iv)
    }

    #[test]
    fn test_generate_then_verify() {
        let prover = BindingProver::new();
        let (key, iv) = material();
        let owner = WalletAddress::new("ownerIdentity");

        let bundle = prover.generate(&key, &iv, &owner).unwrap();
        assert!(prover.verify_bundle(&bundle));
        assert_eq!(bundle.commitment(), Some(commitment(&key, &iv).to_hex().as_str()));
        assert_eq!(bundle.bound_identity(), Some("ownerIdentity"));
    }

    #[test]
    fn test_verify_rejects_swapped_commitment() {
        let prover = BindingProver::new();
        let (key, iv) = material();
        let owner = WalletAddress::new("owner");

        let mut bundle = prover.generate(&key, &iv, &owner).unwrap();
        bundle.public_signals[0] = "00".repeat(32);
        assert!(!prover.verify_bundle(&bundle));
    }

    #[test]
    fn test_verify_rejects_rebound_identity() {
        let prover = BindingProver::new();
        let (key, iv) = material();

        let mut bundle = prover
            .generate(&key, &iv, &WalletAddress::new("alice"))
            .unwrap();
        bundle.public_signals[1] = "mallory".to_string();
        assert!(!prover.verify_bundle(&bundle));
    }

    #[test]
    fn test_verify_never_panics_on_garbage() {
        let prover = BindingProver::new();
        let garbage = ZkProof {
            protocol: PROTOCOL.into(),
            curve: CURVE.into(),
            body: serde_json::json!({"binding_key": "!!", "signature": 7}),
        };
        assert!(!prover.verify(&garbage, &["a".into(), "b".into()]));
        assert!(!prover.verify(&garbage, &[]));
        assert!(!prover.verify(&garbage, &["one".into()]));
    }

    #[test]
    fn test_verify_rejects_wrong_protocol() {
        let prover = BindingProver::new();
        let (key, iv) = material();
        let mut bundle = prover
            .generate(&key, &iv, &WalletAddress::new("owner"))
            .unwrap();
        bundle.proof.protocol = "groth16".into();
        assert!(!prover.verify_bundle(&bundle));
    }

    #[test]
    fn test_verification_key_json_roundtrip() {
        let vk = VerificationKey::default();
        let recovered = VerificationKey::from_json(&vk.to_json()).unwrap();
        assert_eq!(vk, recovered);
        assert!(VerificationKey::from_json("not json").is_err());
    }

    #[test]
    fn test_proof_is_deterministic_per_material() {
        // Same secret material, same owner: byte-identical proof. Useful
        // for re-generation after a crash.
        let prover = BindingProver::new();
        let (key, iv) = material();
        let owner = WalletAddress::new("owner");

        let a = prover.generate(&key, &iv, &owner).unwrap();
        let b = prover.generate(&key, &iv, &owner).unwrap();
        assert_eq!(a, b);
    }
}
