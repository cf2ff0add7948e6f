//! Store trait: the abstract interface for zkPFP persistence.
//!
//! This trait keeps the gateway storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use zkpfp_core::{
    AccessGrant, AccessSession, AssetId, CreditTransaction, EncryptedAsset, PlatformAccount,
    PlatformId, SessionId, UsdCents,
};

use crate::error::Result;

/// Balance movement applied by a successful ledger write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerUpdate {
    /// Balance before the entry was applied.
    pub previous_balance: UsdCents,
    /// Balance after, as recorded on the ledger row.
    pub new_balance: UsdCents,
}

/// Result of applying a topup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopupOutcome {
    /// The topup was credited.
    Applied(LedgerUpdate),
    /// This chain signature was already consumed; nothing changed
    /// (idempotent - not an error).
    DuplicateSignature,
}

/// Result of applying a debit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebitOutcome {
    /// The debit was applied.
    Applied(LedgerUpdate),
    /// Balance was below the required amount; nothing changed.
    InsufficientFunds {
        balance: UsdCents,
        required: UsdCents,
    },
}

/// The Store trait: async interface for zkPFP persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Outcome enums over errors**: expected contention (duplicate topup,
///   insufficient funds) is a return value, not an error; errors are reserved
///   for storage failure.
/// - **Atomic ledger writes**: `apply_topup` and `apply_debit` update the
///   balance and append the ledger row in one transaction. The balance column
///   and the ledger must never diverge.
/// - **Append-only ledger**: no method mutates or deletes a ledger row.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Asset Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert an encrypted asset record.
    async fn insert_asset(&self, asset: &EncryptedAsset) -> Result<()>;

    /// Get an asset by id.
    async fn get_asset(&self, id: &AssetId) -> Result<Option<EncryptedAsset>>;

    /// Delete an asset and its grants. Returns whether the asset existed.
    ///
    /// Sessions and ledger rows referencing the asset are kept: they are the
    /// audit trail of access that already happened.
    async fn delete_asset(&self, id: &AssetId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Grant Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Set the grant state for `(asset_id, platform_id)`, creating the row if
    /// absent. Idempotent: setting the current state again changes nothing.
    ///
    /// Returns the grant as stored after the call.
    async fn upsert_grant(
        &self,
        asset_id: &AssetId,
        platform_id: &PlatformId,
        active: bool,
        now: i64,
    ) -> Result<AccessGrant>;

    /// Get the grant for `(asset_id, platform_id)`.
    async fn get_grant(
        &self,
        asset_id: &AssetId,
        platform_id: &PlatformId,
    ) -> Result<Option<AccessGrant>>;

    /// List all grants for an asset, active and revoked.
    async fn list_grants(&self, asset_id: &AssetId) -> Result<Vec<AccessGrant>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Session Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a consent session. Sessions are write-once.
    async fn insert_session(&self, session: &AccessSession) -> Result<()>;

    /// Get a session by id.
    async fn get_session(&self, id: &SessionId) -> Result<Option<AccessSession>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Platform Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a platform account.
    async fn insert_platform(&self, account: &PlatformAccount) -> Result<()>;

    /// Get a platform by id.
    async fn get_platform(&self, id: &PlatformId) -> Result<Option<PlatformAccount>>;

    /// Look up a platform by the SHA-256 hex of its API key.
    async fn get_platform_by_api_key_hash(&self, hash: &str) -> Result<Option<PlatformAccount>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Credit a platform balance for an on-chain payment, atomically with the
    /// ledger row. The chain signature is the dedup key: replaying a consumed
    /// signature returns `DuplicateSignature` and writes nothing.
    async fn apply_topup(
        &self,
        platform_id: &PlatformId,
        amount: UsdCents,
        chain_signature: &str,
        description: &str,
        now: i64,
    ) -> Result<TopupOutcome>;

    /// Debit a platform balance, atomically with the ledger row. Fails soft
    /// with `InsufficientFunds` when the balance cannot cover `amount`.
    async fn apply_debit(
        &self,
        platform_id: &PlatformId,
        amount: UsdCents,
        description: &str,
        now: i64,
    ) -> Result<DebitOutcome>;

    /// List a platform's ledger entries, newest first.
    async fn list_transactions(&self, platform_id: &PlatformId) -> Result<Vec<CreditTransaction>>;
}
