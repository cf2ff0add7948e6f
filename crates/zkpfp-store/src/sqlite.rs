//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for the zkPFP gateway. It uses
//! rusqlite with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use zkpfp_core::{
    AccessGrant, AccessSession, AssetId, CreditTransaction, EncryptedAsset, PlatformAccount,
    PlatformId, ProofAttachment, ProofBundle, SessionId, Sha256Hash, TransactionType, UsdCents,
    WalletAddress,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{DebitOutcome, LedgerUpdate, Store, TopupOutcome};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mappers
// ─────────────────────────────────────────────────────────────────────────────

fn invalid_column(name: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(0, name.into(), rusqlite::types::Type::Blob)
}

fn row_to_asset(row: &rusqlite::Row<'_>) -> rusqlite::Result<EncryptedAsset> {
    let commitment_bytes: Vec<u8> = row.get("commitment")?;
    let commitment = Sha256Hash::from_bytes(
        commitment_bytes
            .try_into()
            .map_err(|_| invalid_column("commitment"))?,
    );

    let proof_json: Option<String> = row.get("proof")?;
    let proof = match proof_json {
        Some(json) => {
            let bundle: ProofBundle =
                serde_json::from_str(&json).map_err(|_| invalid_column("proof"))?;
            ProofAttachment::Present(bundle)
        }
        None => ProofAttachment::Absent,
    };

    Ok(EncryptedAsset {
        asset_id: AssetId::new(row.get::<_, String>("asset_id")?),
        owner: WalletAddress::new(row.get::<_, String>("owner")?),
        ciphertext_ref: row.get("ciphertext_ref")?,
        iv: row.get("iv")?,
        wrapped_key: row.get("wrapped_key")?,
        commitment,
        proof,
        created_at: row.get("created_at")?,
    })
}

fn row_to_grant(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccessGrant> {
    Ok(AccessGrant {
        asset_id: AssetId::new(row.get::<_, String>("asset_id")?),
        platform_id: PlatformId::new(row.get::<_, String>("platform_id")?),
        is_active: row.get("is_active")?,
        created_at: row.get("created_at")?,
        revoked_at: row.get("revoked_at")?,
    })
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccessSession> {
    Ok(AccessSession {
        session_id: SessionId::new(row.get::<_, String>("session_id")?),
        asset_id: AssetId::new(row.get::<_, String>("asset_id")?),
        platform_id: PlatformId::new(row.get::<_, String>("platform_id")?),
        viewer: WalletAddress::new(row.get::<_, String>("viewer")?),
        nda_message: row.get("nda_message")?,
        nda_signature: row.get("nda_signature")?,
        nda_hash: row.get("nda_hash")?,
        consent_given: row.get("consent_given")?,
        signer_ip: row.get("signer_ip")?,
        signer_user_agent: row.get("signer_user_agent")?,
        signing_timestamp: row.get("signing_timestamp")?,
        chain_memo_signature: row.get("chain_memo_signature")?,
        expires_at: row.get("expires_at")?,
    })
}

fn row_to_platform(row: &rusqlite::Row<'_>) -> rusqlite::Result<PlatformAccount> {
    Ok(PlatformAccount {
        platform_id: PlatformId::new(row.get::<_, String>("platform_id")?),
        platform_name: row.get("platform_name")?,
        api_key_hash: row.get("api_key_hash")?,
        credit_balance: UsdCents::cents(row.get("credit_balance")?),
        is_active: row.get("is_active")?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<CreditTransaction> {
    let kind: String = row.get("transaction_type")?;
    let transaction_type =
        TransactionType::parse(&kind).ok_or_else(|| invalid_column("transaction_type"))?;

    Ok(CreditTransaction {
        platform_id: PlatformId::new(row.get::<_, String>("platform_id")?),
        transaction_type,
        amount: UsdCents::cents(row.get("amount")?),
        balance_after: UsdCents::cents(row.get("balance_after")?),
        transaction_signature: row.get("transaction_signature")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}

fn proof_to_json(proof: &ProofAttachment) -> Result<Option<String>> {
    match proof {
        ProofAttachment::Present(bundle) => serde_json::to_string(bundle)
            .map(Some)
            .map_err(|e| StoreError::Serialization(e.to_string())),
        ProofAttachment::Absent => Ok(None),
    }
}

/// Read a balance inside an open transaction, locking the row's state for
/// the duration of the transaction.
fn balance_in_tx(tx: &rusqlite::Transaction<'_>, platform_id: &PlatformId) -> Result<UsdCents> {
    let cents: Option<i64> = tx
        .query_row(
            "SELECT credit_balance FROM platform_accounts WHERE platform_id = ?1",
            params![platform_id.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    cents
        .map(UsdCents::cents)
        .ok_or_else(|| StoreError::NotFound(format!("platform {}", platform_id)))
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_asset(&self, asset: &EncryptedAsset) -> Result<()> {
        let asset = asset.clone();
        self.blocking(move |conn| {
            let proof = proof_to_json(&asset.proof)?;
            conn.execute(
                "INSERT INTO encrypted_assets
                     (asset_id, owner, ciphertext_ref, iv, wrapped_key, commitment, proof, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    asset.asset_id.as_str(),
                    asset.owner.as_str(),
                    asset.ciphertext_ref,
                    asset.iv,
                    asset.wrapped_key,
                    asset.commitment.as_bytes().as_slice(),
                    proof,
                    asset.created_at,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_asset(&self, id: &AssetId) -> Result<Option<EncryptedAsset>> {
        let id = id.clone();
        self.blocking(move |conn| {
            let asset = conn
                .query_row(
                    "SELECT * FROM encrypted_assets WHERE asset_id = ?1",
                    params![id.as_str()],
                    row_to_asset,
                )
                .optional()?;
            Ok(asset)
        })
        .await
    }

    async fn delete_asset(&self, id: &AssetId) -> Result<bool> {
        let id = id.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let deleted = tx.execute(
                "DELETE FROM encrypted_assets WHERE asset_id = ?1",
                params![id.as_str()],
            )?;
            tx.execute(
                "DELETE FROM access_grants WHERE asset_id = ?1",
                params![id.as_str()],
            )?;
            tx.commit()?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn upsert_grant(
        &self,
        asset_id: &AssetId,
        platform_id: &PlatformId,
        active: bool,
        now: i64,
    ) -> Result<AccessGrant> {
        let asset_id = asset_id.clone();
        let platform_id = platform_id.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let existing = tx
                .query_row(
                    "SELECT * FROM access_grants WHERE asset_id = ?1 AND platform_id = ?2",
                    params![asset_id.as_str(), platform_id.as_str()],
                    row_to_grant,
                )
                .optional()?;

            let grant = match existing {
                Some(grant) if grant.is_active == active => grant,
                Some(mut grant) => {
                    grant.is_active = active;
                    grant.revoked_at = if active { None } else { Some(now) };
                    tx.execute(
                        "UPDATE access_grants SET is_active = ?3, revoked_at = ?4
                         WHERE asset_id = ?1 AND platform_id = ?2",
                        params![
                            asset_id.as_str(),
                            platform_id.as_str(),
                            grant.is_active,
                            grant.revoked_at,
                        ],
                    )?;
                    grant
                }
                None => {
                    let grant = AccessGrant {
                        asset_id: asset_id.clone(),
                        platform_id: platform_id.clone(),
                        is_active: active,
                        created_at: now,
                        revoked_at: if active { None } else { Some(now) },
                    };
                    tx.execute(
                        "INSERT INTO access_grants
                             (asset_id, platform_id, is_active, created_at, revoked_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            asset_id.as_str(),
                            platform_id.as_str(),
                            grant.is_active,
                            grant.created_at,
                            grant.revoked_at,
                        ],
                    )?;
                    grant
                }
            };

            tx.commit()?;
            Ok(grant)
        })
        .await
    }

    async fn get_grant(
        &self,
        asset_id: &AssetId,
        platform_id: &PlatformId,
    ) -> Result<Option<AccessGrant>> {
        let asset_id = asset_id.clone();
        let platform_id = platform_id.clone();
        self.blocking(move |conn| {
            let grant = conn
                .query_row(
                    "SELECT * FROM access_grants WHERE asset_id = ?1 AND platform_id = ?2",
                    params![asset_id.as_str(), platform_id.as_str()],
                    row_to_grant,
                )
                .optional()?;
            Ok(grant)
        })
        .await
    }

    async fn list_grants(&self, asset_id: &AssetId) -> Result<Vec<AccessGrant>> {
        let asset_id = asset_id.clone();
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM access_grants WHERE asset_id = ?1 ORDER BY platform_id",
            )?;
            let grants = stmt
                .query_map(params![asset_id.as_str()], row_to_grant)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(grants)
        })
        .await
    }

    async fn insert_session(&self, session: &AccessSession) -> Result<()> {
        let session = session.clone();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO access_sessions
                     (session_id, asset_id, platform_id, viewer, nda_message, nda_signature,
                      nda_hash, consent_given, signer_ip, signer_user_agent,
                      signing_timestamp, chain_memo_signature, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    session.session_id.as_str(),
                    session.asset_id.as_str(),
                    session.platform_id.as_str(),
                    session.viewer.as_str(),
                    session.nda_message,
                    session.nda_signature,
                    session.nda_hash,
                    session.consent_given,
                    session.signer_ip,
                    session.signer_user_agent,
                    session.signing_timestamp,
                    session.chain_memo_signature,
                    session.expires_at,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<AccessSession>> {
        let id = id.clone();
        self.blocking(move |conn| {
            let session = conn
                .query_row(
                    "SELECT * FROM access_sessions WHERE session_id = ?1",
                    params![id.as_str()],
                    row_to_session,
                )
                .optional()?;
            Ok(session)
        })
        .await
    }

    async fn insert_platform(&self, account: &PlatformAccount) -> Result<()> {
        let account = account.clone();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO platform_accounts
                     (platform_id, platform_name, api_key_hash, credit_balance, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    account.platform_id.as_str(),
                    account.platform_name,
                    account.api_key_hash,
                    account.credit_balance.as_cents(),
                    account.is_active,
                    account.created_at,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_platform(&self, id: &PlatformId) -> Result<Option<PlatformAccount>> {
        let id = id.clone();
        self.blocking(move |conn| {
            let account = conn
                .query_row(
                    "SELECT * FROM platform_accounts WHERE platform_id = ?1",
                    params![id.as_str()],
                    row_to_platform,
                )
                .optional()?;
            Ok(account)
        })
        .await
    }

    async fn get_platform_by_api_key_hash(&self, hash: &str) -> Result<Option<PlatformAccount>> {
        let hash = hash.to_string();
        self.blocking(move |conn| {
            let account = conn
                .query_row(
                    "SELECT * FROM platform_accounts WHERE api_key_hash = ?1",
                    params![hash],
                    row_to_platform,
                )
                .optional()?;
            Ok(account)
        })
        .await
    }

    async fn apply_topup(
        &self,
        platform_id: &PlatformId,
        amount: UsdCents,
        chain_signature: &str,
        description: &str,
        now: i64,
    ) -> Result<TopupOutcome> {
        let platform_id = platform_id.clone();
        let chain_signature = chain_signature.to_string();
        let description = description.to_string();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let consumed: Option<String> = tx
                .query_row(
                    "SELECT chain_signature FROM credit_topups WHERE chain_signature = ?1",
                    params![chain_signature],
                    |row| row.get(0),
                )
                .optional()?;
            if consumed.is_some() {
                return Ok(TopupOutcome::DuplicateSignature);
            }

            let previous = balance_in_tx(&tx, &platform_id)?;
            let new_balance = previous
                .checked_add(amount)
                .ok_or_else(|| StoreError::BalanceOverflow(platform_id.to_string()))?;

            tx.execute(
                "UPDATE platform_accounts SET credit_balance = ?2 WHERE platform_id = ?1",
                params![platform_id.as_str(), new_balance.as_cents()],
            )?;
            tx.execute(
                "INSERT INTO credit_topups (chain_signature, platform_id, amount, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    chain_signature,
                    platform_id.as_str(),
                    amount.as_cents(),
                    now
                ],
            )?;
            tx.execute(
                "INSERT INTO credit_transactions
                     (platform_id, transaction_type, amount, balance_after,
                      transaction_signature, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    platform_id.as_str(),
                    TransactionType::Topup.as_str(),
                    amount.as_cents(),
                    new_balance.as_cents(),
                    chain_signature,
                    description,
                    now,
                ],
            )?;

            tx.commit()?;
            Ok(TopupOutcome::Applied(LedgerUpdate {
                previous_balance: previous,
                new_balance,
            }))
        })
        .await
    }

    async fn apply_debit(
        &self,
        platform_id: &PlatformId,
        amount: UsdCents,
        description: &str,
        now: i64,
    ) -> Result<DebitOutcome> {
        let platform_id = platform_id.clone();
        let description = description.to_string();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let previous = balance_in_tx(&tx, &platform_id)?;
            if previous < amount {
                return Ok(DebitOutcome::InsufficientFunds {
                    balance: previous,
                    required: amount,
                });
            }

            let new_balance = previous
                .checked_sub(amount)
                .ok_or_else(|| StoreError::BalanceOverflow(platform_id.to_string()))?;

            tx.execute(
                "UPDATE platform_accounts SET credit_balance = ?2 WHERE platform_id = ?1",
                params![platform_id.as_str(), new_balance.as_cents()],
            )?;
            tx.execute(
                "INSERT INTO credit_transactions
                     (platform_id, transaction_type, amount, balance_after,
                      transaction_signature, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?6)",
                params![
                    platform_id.as_str(),
                    TransactionType::Reveal.as_str(),
                    amount.negated().as_cents(),
                    new_balance.as_cents(),
                    description,
                    now,
                ],
            )?;

            tx.commit()?;
            Ok(DebitOutcome::Applied(LedgerUpdate {
                previous_balance: previous,
                new_balance,
            }))
        })
        .await
    }

    async fn list_transactions(&self, platform_id: &PlatformId) -> Result<Vec<CreditTransaction>> {
        let platform_id = platform_id.clone();
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM credit_transactions WHERE platform_id = ?1
                 ORDER BY created_at DESC, id DESC",
            )?;
            let entries = stmt
                .query_map(params![platform_id.as_str()], row_to_transaction)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkpfp_core::{ProofBundle, ZkProof};

    fn asset(id: &str) -> EncryptedAsset {
        EncryptedAsset {
            asset_id: AssetId::new(id),
            owner: WalletAddress::new("ownerWallet"),
            ciphertext_ref: format!("blobs/{id}"),
            iv: "aXYtYnl0ZXM=".into(),
            wrapped_key: "d3JhcHBlZA==".into(),
            commitment: Sha256Hash::hash(id.as_bytes()),
            proof: ProofAttachment::Absent,
            created_at: 1_000,
        }
    }

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
    async fn test_asset_roundtrip_with_proof() {
        let store = SqliteStore::open_memory().unwrap();
        let mut a = asset("a1");
        a.proof = ProofAttachment::Present(ProofBundle {
            proof: ZkProof {
                protocol: "zkpfp-binding-v1".into(),
                curve: "ed25519".into(),
                body: serde_json::json!({"binding_key": "k", "signature": "s"}),
            },
            public_signals: vec![a.commitment.to_hex(), "ownerWallet".into()],
        });

        store.insert_asset(&a).await.unwrap();
        let loaded = store.get_asset(&a.asset_id).await.unwrap().unwrap();
        assert_eq!(loaded, a);

        assert!(store.get_asset(&AssetId::new("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_asset_removes_grants_keeps_sessions() {
        let store = SqliteStore::open_memory().unwrap();
        let a = asset("a1");
        store.insert_asset(&a).await.unwrap();
        let pid = PlatformId::new("p1");
        store.upsert_grant(&a.asset_id, &pid, true, 1_000).await.unwrap();

        let session = AccessSession {
            session_id: SessionId::new("s1"),
            asset_id: a.asset_id.clone(),
            platform_id: pid.clone(),
            viewer: WalletAddress::new("viewer"),
            nda_message: "msg".into(),
            nda_signature: "sig".into(),
            nda_hash: "hash".into(),
            consent_given: true,
            signer_ip: "unknown".into(),
            signer_user_agent: "unknown".into(),
            signing_timestamp: 1_000,
            chain_memo_signature: None,
            expires_at: 2_000,
        };
        store.insert_session(&session).await.unwrap();

        assert!(store.delete_asset(&a.asset_id).await.unwrap());
        assert!(store.get_asset(&a.asset_id).await.unwrap().is_none());
        assert!(store.get_grant(&a.asset_id, &pid).await.unwrap().is_none());
        // The audit trail survives the burn.
        assert!(store.get_session(&session.session_id).await.unwrap().is_some());

        assert!(!store.delete_asset(&a.asset_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_grant_toggle_stamps_revoked_at() {
        let store = SqliteStore::open_memory().unwrap();
        let aid = AssetId::new("a1");
        let pid = PlatformId::new("p1");

        let granted = store.upsert_grant(&aid, &pid, true, 1_000).await.unwrap();
        assert!(granted.is_active);
        assert_eq!(granted.created_at, 1_000);
        assert_eq!(granted.revoked_at, None);

        // Toggling to the same state is a no-op.
        let again = store.upsert_grant(&aid, &pid, true, 2_000).await.unwrap();
        assert_eq!(again, granted);

        let revoked = store.upsert_grant(&aid, &pid, false, 3_000).await.unwrap();
        assert!(!revoked.is_active);
        assert_eq!(revoked.revoked_at, Some(3_000));
        assert_eq!(revoked.created_at, 1_000);

        let regranted = store.upsert_grant(&aid, &pid, true, 4_000).await.unwrap();
        assert!(regranted.is_active);
        assert_eq!(regranted.revoked_at, None);

        assert_eq!(store.list_grants(&aid).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_topup_is_deduplicated_by_signature() {
        let store = SqliteStore::open_memory().unwrap();
        store.insert_platform(&platform("p1", UsdCents::ZERO)).await.unwrap();
        let pid = PlatformId::new("p1");

        let first = store
            .apply_topup(&pid, UsdCents::dollars(10), "sig1", "topup", 1_000)
            .await
            .unwrap();
        assert_eq!(
            first,
            TopupOutcome::Applied(LedgerUpdate {
                previous_balance: UsdCents::ZERO,
                new_balance: UsdCents::dollars(10),
            })
        );

        let replay = store
            .apply_topup(&pid, UsdCents::dollars(10), "sig1", "topup", 2_000)
            .await
            .unwrap();
        assert_eq!(replay, TopupOutcome::DuplicateSignature);

        let account = store.get_platform(&pid).await.unwrap().unwrap();
        assert_eq!(account.credit_balance, UsdCents::dollars(10));
        assert_eq!(store.list_transactions(&pid).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_debit_fails_soft_below_balance() {
        let store = SqliteStore::open_memory().unwrap();
        store.insert_platform(&platform("p1", UsdCents::cents(40))).await.unwrap();
        let pid = PlatformId::new("p1");

        let outcome = store
            .apply_debit(&pid, UsdCents::cents(50), "reveal", 1_000)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            DebitOutcome::InsufficientFunds {
                balance: UsdCents::cents(40),
                required: UsdCents::cents(50),
            }
        );
        // Nothing written on the soft failure.
        assert!(store.list_transactions(&pid).await.unwrap().is_empty());

        store
            .apply_topup(&pid, UsdCents::cents(60), "sig1", "topup", 2_000)
            .await
            .unwrap();
        let outcome = store
            .apply_debit(&pid, UsdCents::cents(50), "reveal", 3_000)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            DebitOutcome::Applied(LedgerUpdate {
                previous_balance: UsdCents::dollars(1),
                new_balance: UsdCents::cents(50),
            })
        );

        let ledger = store.list_transactions(&pid).await.unwrap();
        assert_eq!(ledger.len(), 2);
        // Newest first.
        assert_eq!(ledger[0].transaction_type, TransactionType::Reveal);
        assert_eq!(ledger[0].amount, UsdCents::cents(-50));
        assert_eq!(ledger[0].balance_after, UsdCents::cents(50));
        assert_eq!(ledger[1].transaction_type, TransactionType::Topup);
    }

    #[tokio::test]
    async fn test_ledger_ops_require_existing_platform() {
        let store = SqliteStore::open_memory().unwrap();
        let pid = PlatformId::new("ghost");
        let err = store
            .apply_debit(&pid, UsdCents::cents(50), "reveal", 1_000)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_platform_lookup_by_api_key_hash() {
        let store = SqliteStore::open_memory().unwrap();
        let account = platform("p1", UsdCents::ZERO);
        store.insert_platform(&account).await.unwrap();

        let found = store
            .get_platform_by_api_key_hash(&account.api_key_hash)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.platform_id, account.platform_id);
        assert!(store
            .get_platform_by_api_key_hash("deadbeef")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zkpfp.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_asset(&asset("a1")).await.unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert!(store.get_asset(&AssetId::new("a1")).await.unwrap().is_some());
    }
}
