//! Strong type definitions for the zkPFP protocol.
//!
//! Identifiers are newtypes to prevent misuse at compile time; money is an
//! integer cent amount so ledger arithmetic is exact.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::{Sha256Hash, WalletAddress};

/// How long a consent session stays valid: exactly 60 minutes.
pub const SESSION_TTL_MS: i64 = 60 * 60 * 1000;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap an existing identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// The identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "({})"), self.0)
            }
        }
    };
}

string_id!(
    /// Opaque, owner-scoped identifier of an encrypted asset.
    AssetId,
    "Asset"
);
string_id!(
    /// Identifier of a registered third-party platform.
    PlatformId,
    "Platform"
);
string_id!(
    /// Identifier of a consent session, generated at signing time.
    SessionId,
    "Session"
);

/// A USD amount in integer cents.
///
/// Signed: ledger transaction amounts are negative for debits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UsdCents(pub i64);

impl UsdCents {
    pub const ZERO: Self = Self(0);

    /// Create from a cent amount.
    pub const fn cents(n: i64) -> Self {
        Self(n)
    }

    /// Create from whole dollars.
    pub const fn dollars(n: i64) -> Self {
        Self(n * 100)
    }

    /// The raw cent amount.
    pub const fn as_cents(&self) -> i64 {
        self.0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checked addition.
    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction.
    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Negate (for ledger debit rows).
    pub const fn negated(&self) -> Self {
        Self(-self.0)
    }
}

impl fmt::Display for UsdCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl fmt::Debug for UsdCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UsdCents({})", self.0)
    }
}

/// A proof artifact attesting knowledge of the encryption key behind a
/// commitment, in its serialized wire form.
///
/// The `body` layout is owned by the proof backend; `protocol` and `curve`
/// name the backend so verifiers can dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZkProof {
    pub protocol: String,
    pub curve: String,
    pub body: serde_json::Value,
}

/// A proof plus its public signals.
///
/// By convention `public_signals[0]` is the commitment (hex) and
/// `public_signals[1]` the owner identity the proof is bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofBundle {
    pub proof: ZkProof,
    pub public_signals: Vec<String>,
}

impl ProofBundle {
    /// The commitment the proof claims to open, if present.
    pub fn commitment(&self) -> Option<&str> {
        self.public_signals.first().map(String::as_str)
    }

    /// The identity the proof is bound to, if present.
    pub fn bound_identity(&self) -> Option<&str> {
        self.public_signals.get(1).map(String::as_str)
    }
}

/// Proof presence on an asset.
///
/// Proof generation failure degrades asset creation rather than aborting
/// it, so absence is a first-class state, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProofAttachment {
    Present(ProofBundle),
    Absent,
}

impl ProofAttachment {
    pub fn is_present(&self) -> bool {
        matches!(self, ProofAttachment::Present(_))
    }

    pub fn bundle(&self) -> Option<&ProofBundle> {
        match self {
            ProofAttachment::Present(b) => Some(b),
            ProofAttachment::Absent => None,
        }
    }
}

/// An encrypted photo asset. Created once by the owner's encryption step,
/// immutable thereafter, deleted only by explicit owner burn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedAsset {
    pub asset_id: AssetId,
    pub owner: WalletAddress,
    /// Storage pointer to the ciphertext blob.
    pub ciphertext_ref: String,
    /// Base64, 96-bit content IV.
    pub iv: String,
    /// Base64, wrapping IV prefixed to the wrapped 256-bit key.
    pub wrapped_key: String,
    /// SHA256(symmetric_key ‖ iv): the public fingerprint, independent of
    /// the ciphertext bytes.
    pub commitment: Sha256Hash,
    pub proof: ProofAttachment,
    pub created_at: i64,
}

/// Per (asset, platform) authorization switch, owned by the asset owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub asset_id: AssetId,
    pub platform_id: PlatformId,
    pub is_active: bool,
    pub created_at: i64,
    pub revoked_at: Option<i64>,
}

/// A time-boxed, signed record of viewer consent. Immutable; expiry is
/// enforced by comparison at use time, never by background sweeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessSession {
    pub session_id: SessionId,
    pub asset_id: AssetId,
    pub platform_id: PlatformId,
    pub viewer: WalletAddress,
    /// The full canonical consent message the viewer signed.
    pub nda_message: String,
    /// Base58 viewer signature over `nda_message`.
    pub nda_signature: String,
    /// SHA-256 hex of the populated NDA document.
    pub nda_hash: String,
    pub consent_given: bool,
    pub signer_ip: String,
    pub signer_user_agent: String,
    pub signing_timestamp: i64,
    pub chain_memo_signature: Option<String>,
    pub expires_at: i64,
}

impl AccessSession {
    /// Whether the session is past its validity window at `now`.
    ///
    /// Expiry is strict: a session is invalid at exactly `expires_at`.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// A registered platform account with its prepaid credit balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformAccount {
    pub platform_id: PlatformId,
    pub platform_name: String,
    /// SHA-256 hex of the raw API key; the raw key is never stored.
    pub api_key_hash: String,
    pub credit_balance: UsdCents,
    pub is_active: bool,
    pub created_at: i64,
}

/// Kind of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Topup,
    Reveal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Topup => "topup",
            TransactionType::Reveal => "reveal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "topup" => Some(TransactionType::Topup),
            "reveal" => Some(TransactionType::Reveal),
            _ => None,
        }
    }
}

/// An append-only ledger entry. Write-once; the audit trail of record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub platform_id: PlatformId,
    pub transaction_type: TransactionType,
    /// Signed: positive for topups, negative for reveals.
    pub amount: UsdCents,
    /// Balance snapshot after this entry was applied, never recomputed.
    pub balance_after: UsdCents,
    /// The on-chain payment signature for topups.
    pub transaction_signature: Option<String>,
    pub description: String,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usd_cents_display() {
        assert_eq!(UsdCents::cents(50).to_string(), "$0.50");
        assert_eq!(UsdCents::dollars(10).to_string(), "$10.00");
        assert_eq!(UsdCents::cents(-50).to_string(), "-$0.50");
        assert_eq!(UsdCents::cents(105).to_string(), "$1.05");
    }

    #[test]
    fn test_usd_cents_arithmetic() {
        let a = UsdCents::dollars(1);
        let b = UsdCents::cents(50);
        assert_eq!(a.checked_sub(b), Some(UsdCents::cents(50)));
        assert_eq!(b.negated(), UsdCents::cents(-50));
        assert!(b.is_positive());
        assert!(!UsdCents::ZERO.is_positive());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn test_session_expiry_is_strict() {
        let session = AccessSession {
            session_id: SessionId::new("s"),
            asset_id: AssetId::new("a"),
            platform_id: PlatformId::new("p"),
            viewer: WalletAddress::new("v"),
            nda_message: String::new(),
            nda_signature: String::new(),
            nda_hash: String::new(),
            consent_given: true,
            signer_ip: "unknown".into(),
            signer_user_agent: "unknown".into(),
            signing_timestamp: 1_000,
            chain_memo_signature: None,
            expires_at: 1_000 + SESSION_TTL_MS,
        };

        assert!(!session.is_expired(1_000 + SESSION_TTL_MS - 1));
        assert!(session.is_expired(1_000 + SESSION_TTL_MS));
        assert!(session.is_expired(1_000 + SESSION_TTL_MS + 1));
    }

    #[test]
    fn test_transaction_type_roundtrip() {
        assert_eq!(
            TransactionType::parse(TransactionType::Topup.as_str()),
            Some(TransactionType::Topup)
        );
        assert_eq!(TransactionType::parse("refund"), None);
    }

    #[test]
    fn test_proof_attachment_accessors() {
        let bundle = ProofBundle {
            proof: ZkProof {
                protocol: "test".into(),
                curve: "ed25519".into(),
                body: serde_json::json!({}),
            },
            public_signals: vec!["aabb".into(), "owner".into()],
        };
        let present = ProofAttachment::Present(bundle.clone());
        assert!(present.is_present());
        assert_eq!(present.bundle().unwrap().commitment(), Some("aabb"));
        assert_eq!(bundle.bound_identity(), Some("owner"));
        assert!(!ProofAttachment::Absent.is_present());
    }
}
