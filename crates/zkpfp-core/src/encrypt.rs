//! The commitment encryptor: AES-256-GCM content encryption, an
//! identity-derived key-wrapping step, and the public commitment.
//!
//! The wrapping key is a pure hash of the owner's *public* identity string.
//! That makes the scheme binding but not hiding against anyone who knows
//! the identity: this primitive provides the commitment guarantee, and the
//! reveal gateway is the actual confidentiality boundary.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::{Sha256Hash, WalletAddress};
use crate::error::CryptoError;
use crate::types::ProofAttachment;

/// Domain separator for the identity-derived wrapping key.
pub const KEY_DERIVATION_DOMAIN: &str = "zkpfp-key-derivation";

/// 256-bit symmetric key.
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// 96-bit AES-GCM IV.
pub const IV_LEN: usize = 12;

/// Cosmetic progress reporting for long-running client-side work.
///
/// Fires with a stage label and a 0..=100 percentage. Never load-bearing:
/// correctness must not depend on any call happening.
pub type ProgressFn<'a> = &'a mut dyn FnMut(&str, u8);

/// Output of the encryption pipeline, in wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedImage {
    /// Base64 AES-256-GCM ciphertext of the image.
    pub ciphertext: String,
    /// Base64, wrapping IV prefixed to the wrapped symmetric key.
    pub wrapped_key: String,
    /// Base64 content IV.
    pub iv: String,
    /// SHA256(symmetric_key ‖ iv).
    pub commitment: Sha256Hash,
}

/// The public commitment over the secret key material.
pub fn commitment(symmetric_key: &[u8; SYMMETRIC_KEY_LEN], iv: &[u8; IV_LEN]) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update(symmetric_key);
    hasher.update(iv);
    Sha256Hash(hasher.finalize().into())
}

/// Derive the key-wrapping key from the owner identity.
///
/// Deterministic on purpose: the owner re-derives it at decryption time
/// without any interactive signing step.
fn derive_wrapping_key(owner: &WalletAddress) -> [u8; SYMMETRIC_KEY_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(KEY_DERIVATION_DOMAIN.as_bytes());
    hasher.update(b":");
    hasher.update(owner.as_str().as_bytes());
    hasher.finalize().into()
}

fn aes_encrypt(key: &[u8; 32], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::Encryption(e.to_string()))?;
    cipher
        .encrypt(Nonce::from_slice(iv), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))
}

fn aes_decrypt(key: &[u8; 32], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if iv.len() != IV_LEN {
        return Err(CryptoError::Malformed {
            field: "iv",
            reason: format!("expected {} bytes, got {}", IV_LEN, iv.len()),
        });
    }
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::Encryption(e.to_string()))?;
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| CryptoError::Decryption)
}

/// Encrypt an image for an owner identity, attempting proof generation
/// through `prove`.
///
/// `prove` receives the secret key material exactly once, before it is
/// dropped, and returns the attachment to store. Proof generation failure
/// is a soft failure: callers pass `ProofAttachment::Absent` back and the
/// commitment stays valid without a proof.
pub fn encrypt_image_with<F>(
    image: &[u8],
    owner: &WalletAddress,
    mut progress: Option<ProgressFn<'_>>,
    prove: F,
) -> Result<(EncryptedImage, ProofAttachment), CryptoError>
where
    F: FnOnce(&[u8; SYMMETRIC_KEY_LEN], &[u8; IV_LEN]) -> ProofAttachment,
{
    let mut report = |stage: &str, pct: u8| {
        if let Some(cb) = progress.as_mut() {
            cb(stage, pct);
        }
    };

    report("Generating key material", 0);
    let mut rng = rand::thread_rng();
    let mut symmetric_key = [0u8; SYMMETRIC_KEY_LEN];
    rng.fill_bytes(&mut symmetric_key);
    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut iv);

    report("Encrypting image", 20);
    let ciphertext = aes_encrypt(&symmetric_key, &iv, image)?;

    report("Wrapping key", 60);
    let wrapping_key = derive_wrapping_key(owner);
    let mut key_iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut key_iv);
    let wrapped = aes_encrypt(&wrapping_key, &key_iv, &symmetric_key)?;

    // Wire form prefixes the wrapping IV so decryption is self-contained.
    let mut wrapped_key = Vec::with_capacity(IV_LEN + wrapped.len());
    wrapped_key.extend_from_slice(&key_iv);
    wrapped_key.extend_from_slice(&wrapped);

    report("Computing commitment", 80);
    let commitment = commitment(&symmetric_key, &iv);

    let proof = prove(&symmetric_key, &iv);

    report("Done", 100);
    Ok((
        EncryptedImage {
            ciphertext: BASE64.encode(&ciphertext),
            wrapped_key: BASE64.encode(&wrapped_key),
            iv: BASE64.encode(iv),
            commitment,
        },
        proof,
    ))
}

/// Encrypt without attempting proof generation.
pub fn encrypt_image(
    image: &[u8],
    owner: &WalletAddress,
    progress: Option<ProgressFn<'_>>,
) -> Result<EncryptedImage, CryptoError> {
    let (image, _) = encrypt_image_with(image, owner, progress, |_, _| ProofAttachment::Absent)?;
    Ok(image)
}

/// Decrypt an image: derive the wrapping key, unwrap the symmetric key,
/// decrypt the ciphertext.
///
/// Fails with a typed error on malformed lengths or when AES-GCM
/// authentication fails (tampered data, wrong identity). Never returns
/// wrong plaintext silently.
pub fn decrypt_image(
    ciphertext_b64: &str,
    wrapped_key_b64: &str,
    iv_b64: &str,
    owner: &WalletAddress,
) -> Result<Vec<u8>, CryptoError> {
    let ciphertext = BASE64
        .decode(ciphertext_b64)
        .map_err(|e| CryptoError::Malformed {
            field: "ciphertext",
            reason: e.to_string(),
        })?;
    let wrapped_key = BASE64
        .decode(wrapped_key_b64)
        .map_err(|e| CryptoError::Malformed {
            field: "wrapped_key",
            reason: e.to_string(),
        })?;
    let iv = BASE64.decode(iv_b64).map_err(|e| CryptoError::Malformed {
        field: "iv",
        reason: e.to_string(),
    })?;

    if wrapped_key.len() <= IV_LEN {
        return Err(CryptoError::Malformed {
            field: "wrapped_key",
            reason: format!("too short: {} bytes", wrapped_key.len()),
        });
    }
    let (key_iv, wrapped) = wrapped_key.split_at(IV_LEN);

    let wrapping_key = derive_wrapping_key(owner);
    let symmetric_key = aes_decrypt(&wrapping_key, key_iv, wrapped)?;
    let symmetric_key: [u8; SYMMETRIC_KEY_LEN] =
        symmetric_key
            .try_into()
            .map_err(|_| CryptoError::Malformed {
                field: "wrapped_key",
                reason: "unwrapped key is not 32 bytes".into(),
            })?;

    aes_decrypt(&symmetric_key, &iv, &ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn owner() -> WalletAddress {
        WalletAddress::new("9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin")
    }

    #[test]
    fn test_wrapping_key_is_domain_separated_identity_hash() {
        let mut hasher = Sha256::new();
        hasher.update(format!("{KEY_DERIVATION_DOMAIN}:{}", owner().as_str()));
        let expected: [u8; SYMMETRIC_KEY_LEN] = hasher.finalize().into();
        assert_eq!(derive_wrapping_key(&owner()), expected);
        assert_eq!(KEY_DERIVATION_DOMAIN, "zkpfp-key-derivation");
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let image = b"not really a PNG but close enough";
        let encrypted = encrypt_image(image, &owner(), None).unwrap();

        let decrypted = decrypt_image(
            &encrypted.ciphertext,
            &encrypted.wrapped_key,
            &encrypted.iv,
            &owner(),
        )
        .unwrap();
        assert_eq!(decrypted, image);
    }

    #[test]
    fn test_decrypt_wrong_identity_fails() {
        let encrypted = encrypt_image(b"secret image", &owner(), None).unwrap();

        let other = WalletAddress::new("different-identity");
        let result = decrypt_image(
            &encrypted.ciphertext,
            &encrypted.wrapped_key,
            &encrypted.iv,
            &other,
        );
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn test_decrypt_tampered_ciphertext_fails() {
        let encrypted = encrypt_image(b"secret image", &owner(), None).unwrap();

        let mut raw = BASE64.decode(&encrypted.ciphertext).unwrap();
        raw[0] ^= 0x01;
        let tampered = BASE64.encode(&raw);

        let result = decrypt_image(&tampered, &encrypted.wrapped_key, &encrypted.iv, &owner());
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn test_decrypt_malformed_inputs() {
        let encrypted = encrypt_image(b"img", &owner(), None).unwrap();

        // Not base64 at all
        assert!(matches!(
            decrypt_image("@@@", &encrypted.wrapped_key, &encrypted.iv, &owner()),
            Err(CryptoError::Malformed { field: "ciphertext", .. })
        ));

        // Wrapped key shorter than its IV prefix
        let short = BASE64.encode([0u8; 8]);
        assert!(matches!(
            decrypt_image(&encrypted.ciphertext, &short, &encrypted.iv, &owner()),
            Err(CryptoError::Malformed { field: "wrapped_key", .. })
        ));

        // IV of the wrong length
        let bad_iv = BASE64.encode([0u8; 7]);
        assert!(matches!(
            decrypt_image(&encrypted.ciphertext, &encrypted.wrapped_key, &bad_iv, &owner()),
            Err(CryptoError::Malformed { field: "iv", .. })
        ));
    }

    #[test]
    fn test_commitment_independent_of_ciphertext() {
        // Same key/iv, different images: same commitment.
        let key = [7u8; SYMMETRIC_KEY_LEN];
        let iv = [9u8; IV_LEN];
        assert_eq!(commitment(&key, &iv), commitment(&key, &iv));

        let mut other_iv = iv;
        other_iv[0] ^= 1;
        assert_ne!(commitment(&key, &iv), commitment(&key, &other_iv));
    }

    #[test]
    fn test_progress_callback_is_cosmetic() {
        let mut stages = Vec::new();
        let mut cb = |stage: &str, pct: u8| stages.push((stage.to_string(), pct));
        let with_progress = encrypt_image(b"img", &owner(), Some(&mut cb)).unwrap();
        let without = encrypt_image(b"img", &owner(), None).unwrap();

        assert!(!stages.is_empty());
        assert_eq!(stages.last().unwrap().1, 100);
        // Both decrypt fine; the callback gates nothing.
        assert!(decrypt_image(
            &with_progress.ciphertext,
            &with_progress.wrapped_key,
            &with_progress.iv,
            &owner()
        )
        .is_ok());
        assert!(
            decrypt_image(&without.ciphertext, &without.wrapped_key, &without.iv, &owner()).is_ok()
        );
    }

    #[test]
    fn test_prove_sees_committed_key_material() {
        let mut seen = None;
        let (image, attachment) = encrypt_image_with(b"img", &owner(), None, |key, iv| {
            seen = Some(commitment(key, iv));
            ProofAttachment::Absent
        })
        .unwrap();
        assert_eq!(seen.unwrap(), image.commitment);
        assert!(!attachment.is_present());
    }

    proptest! {
        #[test]
        fn prop_roundtrip_arbitrary_images(image in proptest::collection::vec(any::<u8>(), 0..2048),
                                           identity in "[A-Za-z1-9]{8,44}") {
            let owner = WalletAddress::new(identity);
            let encrypted = encrypt_image(&image, &owner, None).unwrap();
            let decrypted = decrypt_image(
                &encrypted.ciphertext,
                &encrypted.wrapped_key,
                &encrypted.iv,
                &owner,
            ).unwrap();
            prop_assert_eq!(decrypted, image);
        }

        #[test]
        fn prop_commitments_collision_free(a in any::<[u8; 32]>(), b in any::<[u8; 32]>(),
                                           iv_a in any::<[u8; 12]>(), iv_b in any::<[u8; 12]>()) {
            prop_assume!(a != b || iv_a != iv_b);
            prop_assert_ne!(commitment(&a, &iv_a), commitment(&b, &iv_b));
        }
    }
}
