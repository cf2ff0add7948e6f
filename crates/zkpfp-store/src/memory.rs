//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use zkpfp_core::{
    AccessGrant, AccessSession, AssetId, CreditTransaction, EncryptedAsset, PlatformAccount,
    PlatformId, SessionId, UsdCents,
};

use crate::error::{Result, StoreError};
use crate::traits::{DebitOutcome, LedgerUpdate, Store, TopupOutcome};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Assets indexed by id.
    assets: HashMap<AssetId, EncryptedAsset>,

    /// Grants indexed by (asset, platform).
    grants: HashMap<(AssetId, PlatformId), AccessGrant>,

    /// Consent sessions indexed by id.
    sessions: HashMap<SessionId, AccessSession>,

    /// Platform accounts indexed by id.
    platforms: HashMap<PlatformId, PlatformAccount>,

    /// Append-only ledger, oldest first.
    ledger: Vec<CreditTransaction>,

    /// Consumed on-chain payment signatures.
    consumed_signatures: HashSet<String>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_asset(&self, asset: &EncryptedAsset) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.assets.insert(asset.asset_id.clone(), asset.clone());
        Ok(())
    }

    async fn get_asset(&self, id: &AssetId) -> Result<Option<EncryptedAsset>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.assets.get(id).cloned())
    }

    async fn delete_asset(&self, id: &AssetId) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        let existed = inner.assets.remove(id).is_some();
        inner.grants.retain(|(asset_id, _), _| asset_id != id);
        Ok(existed)
    }

    async fn upsert_grant(
        &self,
        asset_id: &AssetId,
        platform_id: &PlatformId,
        active: bool,
        now: i64,
    ) -> Result<AccessGrant> {
        let mut inner = self.inner.write().unwrap();
        let key = (asset_id.clone(), platform_id.clone());

        let grant = inner
            .grants
            .entry(key)
            .and_modify(|grant| {
                if grant.is_active != active {
                    grant.is_active = active;
                    grant.revoked_at = if active { None } else { Some(now) };
                }
            })
            .or_insert_with(|| AccessGrant {
                asset_id: asset_id.clone(),
                platform_id: platform_id.clone(),
                is_active: active,
                created_at: now,
                revoked_at: if active { None } else { Some(now) },
            });

        Ok(grant.clone())
    }

    async fn get_grant(
        &self,
        asset_id: &AssetId,
        platform_id: &PlatformId,
    ) -> Result<Option<AccessGrant>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .grants
            .get(&(asset_id.clone(), platform_id.clone()))
            .cloned())
    }

    async fn list_grants(&self, asset_id: &AssetId) -> Result<Vec<AccessGrant>> {
        let inner = self.inner.read().unwrap();
        let mut grants: Vec<AccessGrant> = inner
            .grants
            .values()
            .filter(|g| &g.asset_id == asset_id)
            .cloned()
            .collect();
        grants.sort_by(|a, b| a.platform_id.as_str().cmp(b.platform_id.as_str()));
        Ok(grants)
    }

    async fn insert_session(&self, session: &AccessSession) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner
            .sessions
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<AccessSession>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.sessions.get(id).cloned())
    }

    async fn insert_platform(&self, account: &PlatformAccount) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner
            .platforms
            .insert(account.platform_id.clone(), account.clone());
        Ok(())
    }

    async fn get_platform(&self, id: &PlatformId) -> Result<Option<PlatformAccount>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.platforms.get(id).cloned())
    }

    async fn get_platform_by_api_key_hash(&self, hash: &str) -> Result<Option<PlatformAccount>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .platforms
            .values()
            .find(|p| p.api_key_hash == hash)
            .cloned())
    }

    async fn apply_topup(
        &self,
        platform_id: &PlatformId,
        amount: UsdCents,
        chain_signature: &str,
        description: &str,
        now: i64,
    ) -> Result<TopupOutcome> {
        let mut inner = self.inner.write().unwrap();

        if inner.consumed_signatures.contains(chain_signature) {
            return Ok(TopupOutcome::DuplicateSignature);
        }

        let account = inner
            .platforms
            .get(platform_id)
            .ok_or_else(|| StoreError::NotFound(format!("platform {}", platform_id)))?;
        let previous = account.credit_balance;
        let new_balance = previous
            .checked_add(amount)
            .ok_or_else(|| StoreError::BalanceOverflow(platform_id.to_string()))?;

        let entry = CreditTransaction {
            platform_id: platform_id.clone(),
            transaction_type: zkpfp_core::TransactionType::Topup,
            amount,
            balance_after: new_balance,
            transaction_signature: Some(chain_signature.to_string()),
            description: description.to_string(),
            created_at: now,
        };

        // All checks passed; apply the whole write.
        inner
            .platforms
            .get_mut(platform_id)
            .expect("checked above")
            .credit_balance = new_balance;
        inner.consumed_signatures.insert(chain_signature.to_string());
        inner.ledger.push(entry);

        Ok(TopupOutcome::Applied(LedgerUpdate {
            previous_balance: previous,
            new_balance,
        }))
    }

    async fn apply_debit(
        &self,
        platform_id: &PlatformId,
        amount: UsdCents,
        description: &str,
        now: i64,
    ) -> Result<DebitOutcome> {
        let mut inner = self.inner.write().unwrap();

        let account = inner
            .platforms
            .get(platform_id)
            .ok_or_else(|| StoreError::NotFound(format!("platform {}", platform_id)))?;
        let previous = account.credit_balance;
        if previous < amount {
            return Ok(DebitOutcome::InsufficientFunds {
                balance: previous,
                required: amount,
            });
        }

        let new_balance = previous
            .checked_sub(amount)
            .ok_or_else(|| StoreError::BalanceOverflow(platform_id.to_string()))?;

        let entry = CreditTransaction {
            platform_id: platform_id.clone(),
            transaction_type: zkpfp_core::TransactionType::Reveal,
            amount: amount.negated(),
            balance_after: new_balance,
            transaction_signature: None,
            description: description.to_string(),
            created_at: now,
        };

        inner
            .platforms
            .get_mut(platform_id)
            .expect("checked above")
            .credit_balance = new_balance;
        inner.ledger.push(entry);

        Ok(DebitOutcome::Applied(LedgerUpdate {
            previous_balance: previous,
            new_balance,
        }))
    }

    async fn list_transactions(&self, platform_id: &PlatformId) -> Result<Vec<CreditTransaction>> {
        let inner = self.inner.read().unwrap();
        let mut entries: Vec<CreditTransaction> = inner
            .ledger
            .iter()
            .filter(|t| &t.platform_id == platform_id)
            .cloned()
            .collect();
        entries.reverse(); // newest first
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(id: &str, balance: UsdCents) -> PlatformAccount {
        PlatformAccount {
            platform_id: PlatformId::new(id),
            platform_name: format!("{id} name"),
            api_key_hash: zkpfp_core::sha256_hex(id.as_bytes()),
            credit_balance: balance,
            is_active: true,
            created_at: 1_000,
        }
    }

    #[tokio::test]
    async fn test_memory_matches_sqlite_topup_semantics() {
        let store = MemoryStore::new();
        store.insert_platform(&platform("p1", UsdCents::ZERO)).await.unwrap();
        let pid = PlatformId::new("p1");

        let first = store
            .apply_topup(&pid, UsdCents::dollars(10), "sig1", "topup", 1_000)
            .await
            .unwrap();
        assert!(matches!(first, TopupOutcome::Applied(_)));
        let replay = store
            .apply_topup(&pid, UsdCents::dollars(10), "sig1", "topup", 2_000)
            .await
            .unwrap();
        assert_eq!(replay, TopupOutcome::DuplicateSignature);

        let account = store.get_platform(&pid).await.unwrap().unwrap();
        assert_eq!(account.credit_balance, UsdCents::dollars(10));
    }

    #[tokio::test]
    async fn test_memory_debit_insufficient_writes_nothing() {
        let store = MemoryStore::new();
        store.insert_platform(&platform("p1", UsdCents::cents(40))).await.unwrap();
        let pid = PlatformId::new("p1");

        let outcome = store
            .apply_debit(&pid, UsdCents::cents(50), "reveal", 1_000)
            .await
            .unwrap();
        assert!(matches!(outcome, DebitOutcome::InsufficientFunds { .. }));
        assert!(store.list_transactions(&pid).await.unwrap().is_empty());
        assert_eq!(
            store.get_platform(&pid).await.unwrap().unwrap().credit_balance,
            UsdCents::cents(40)
        );
    }

    #[tokio::test]
    async fn test_memory_grant_toggle() {
        let store = MemoryStore::new();
        let aid = AssetId::new("a1");
        let pid = PlatformId::new("p1");

        let granted = store.upsert_grant(&aid, &pid, true, 1_000).await.unwrap();
        assert!(granted.is_active && granted.revoked_at.is_none());

        let revoked = store.upsert_grant(&aid, &pid, false, 2_000).await.unwrap();
        assert_eq!(revoked.revoked_at, Some(2_000));
        assert_eq!(revoked.created_at, 1_000);

        // Re-toggling the same state keeps the earlier stamp.
        let still = store.upsert_grant(&aid, &pid, false, 3_000).await.unwrap();
        assert_eq!(still.revoked_at, Some(2_000));
    }
}
