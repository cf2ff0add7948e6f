//! NDA template population and the canonical consent message.
//!
//! Population is a pure function over (template, timestamp, parties): the
//! hash must be byte-identical whether computed by the server at issue time
//! or recomputed later during an audit. The document hash is taken over the
//! populated text *before* the `{{nda_hash}}` placeholder is substituted,
//! since the hash cannot appear inside its own preimage.

use serde::{Deserialize, Serialize};

use crate::crypto::{sha256_hex, WalletAddress};

/// The default NDA template shipped with the system.
pub const DEFAULT_NDA_TEMPLATE: &str = "\
NON-DISCLOSURE AGREEMENT

Executed at: {{timestamp}}

This agreement is between the content owner ({{owner_wallet}}) and the
viewer ({{viewer_wallet}}), mediated by {{platform_name}}.

The viewer agrees not to store, redistribute, or otherwise disclose the
revealed content. Access is time-limited and every reveal is logged and
billed to the requesting platform.

Document hash: {{nda_hash}}
";

/// An NDA template with `{{placeholder}}` markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdaTemplate {
    pub content: String,
}

impl NdaTemplate {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Populate the template for a concrete signing.
    pub fn populate(
        &self,
        owner: &WalletAddress,
        viewer: &WalletAddress,
        platform_name: &str,
        timestamp: i64,
    ) -> PopulatedNda {
        let populated = self
            .content
            .replace("{{timestamp}}", &timestamp.to_string())
            .replace("{{owner_wallet}}", owner.as_str())
            .replace("{{viewer_wallet}}", viewer.as_str())
            .replace("{{platform_name}}", platform_name);

        let hash = sha256_hex(populated.as_bytes());
        let content = populated.replace("{{nda_hash}}", &hash);

        PopulatedNda {
            content,
            hash,
            timestamp,
        }
    }
}

impl Default for NdaTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_NDA_TEMPLATE)
    }
}

/// A populated NDA document, ready for the viewer to sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulatedNda {
    pub content: String,
    /// SHA-256 hex of the populated text, pre hash-substitution.
    pub hash: String,
    pub timestamp: i64,
}

/// The canonical message a viewer signs to consent to an NDA.
///
/// This exact byte sequence is what the signature is verified against;
/// any change here invalidates all outstanding client signers.
pub fn consent_message(nda_hash: &str) -> String {
    format!("Sign NDA Agreement\n\nHash: {nda_hash}\n\nBy signing, I agree to the NDA terms.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parties() -> (WalletAddress, WalletAddress) {
        (
            WalletAddress::new("ownerWallet111"),
            WalletAddress::new("viewerWallet222"),
        )
    }

    #[test]
    fn test_populate_is_deterministic() {
        let (owner, viewer) = parties();
        let template = NdaTemplate::default();

        let a = template.populate(&owner, &viewer, "ExamplePlatform", 1_700_000_000_000);
        let b = template.populate(&owner, &viewer, "ExamplePlatform", 1_700_000_000_000);
        assert_eq!(a, b);
    }

    #[test]
    fn test_populate_substitutes_all_placeholders() {
        let (owner, viewer) = parties();
        let nda = NdaTemplate::default().populate(&owner, &viewer, "ExamplePlatform", 42);

        assert!(!nda.content.contains("{{"));
        assert!(nda.content.contains("ownerWallet111"));
        assert!(nda.content.contains("viewerWallet222"));
        assert!(nda.content.contains("ExamplePlatform"));
        assert!(nda.content.contains(&nda.hash));
    }

    #[test]
    fn test_hash_varies_with_inputs() {
        let (owner, viewer) = parties();
        let template = NdaTemplate::default();

        let a = template.populate(&owner, &viewer, "PlatformA", 1);
        let b = template.populate(&owner, &viewer, "PlatformB", 1);
        let c = template.populate(&owner, &viewer, "PlatformA", 2);
        assert_ne!(a.hash, b.hash);
        assert_ne!(a.hash, c.hash);
    }

    #[test]
    fn test_hash_recomputable_by_auditor() {
        // An auditor with the template and parameters, but not the issued
        // document, must arrive at the same hash.
        let (owner, viewer) = parties();
        let issued = NdaTemplate::default().populate(&owner, &viewer, "P", 99);

        let pre_substitution = DEFAULT_NDA_TEMPLATE
            .replace("{{timestamp}}", "99")
            .replace("{{owner_wallet}}", owner.as_str())
            .replace("{{viewer_wallet}}", viewer.as_str())
            .replace("{{platform_name}}", "P");
        assert_eq!(issued.hash, sha256_hex(pre_substitution.as_bytes()));
    }

    #[test]
    fn test_consent_message_exact_form() {
        assert_eq!(
            consent_message("abc123"),
            "Sign NDA Agreement\n\nHash: abc123\n\nBy signing, I agree to the NDA terms."
        );
    }
}
