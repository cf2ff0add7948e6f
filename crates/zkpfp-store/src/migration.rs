//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Encrypted asset records. Ciphertext lives in blob storage;
        -- this row carries the pointers and the public commitment.
        CREATE TABLE encrypted_assets (
            asset_id TEXT PRIMARY KEY,
            owner TEXT NOT NULL,              -- base58 wallet address
            ciphertext_ref TEXT NOT NULL,     -- storage pointer to the blob
            iv TEXT NOT NULL,                 -- base64, 96-bit content IV
            wrapped_key TEXT NOT NULL,        -- base64, IV-prefixed wrapped key
            commitment BLOB NOT NULL,         -- 32 bytes, SHA256(key || iv)
            proof TEXT,                       -- JSON proof bundle, NULL when absent
            created_at INTEGER NOT NULL
        );

        -- Per (asset, platform) authorization switch.
        CREATE TABLE access_grants (
            asset_id TEXT NOT NULL,
            platform_id TEXT NOT NULL,
            is_active INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            revoked_at INTEGER,               -- set on deactivation, cleared on re-grant
            PRIMARY KEY (asset_id, platform_id)
        );

        -- Signed consent sessions. Write-once; expiry is checked at use
        -- time, rows are never swept.
        CREATE TABLE access_sessions (
            session_id TEXT PRIMARY KEY,
            asset_id TEXT NOT NULL,
            platform_id TEXT NOT NULL,
            viewer TEXT NOT NULL,
            nda_message TEXT NOT NULL,
            nda_signature TEXT NOT NULL,      -- base58 Ed25519
            nda_hash TEXT NOT NULL,           -- SHA-256 hex of the populated NDA
            consent_given INTEGER NOT NULL,
            signer_ip TEXT NOT NULL,
            signer_user_agent TEXT NOT NULL,
            signing_timestamp INTEGER NOT NULL,
            chain_memo_signature TEXT,
            expires_at INTEGER NOT NULL
        );

        -- Platform accounts with their prepaid balance. The balance column
        -- is a cache of the ledger and is only written inside the same
        -- transaction as a ledger row.
        CREATE TABLE platform_accounts (
            platform_id TEXT PRIMARY KEY,
            platform_name TEXT NOT NULL,
            api_key_hash TEXT NOT NULL UNIQUE, -- SHA-256 hex; raw key never stored
            credit_balance INTEGER NOT NULL DEFAULT 0,  -- cents
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL
        );

        -- Append-only ledger. Rows are never updated or deleted.
        CREATE TABLE credit_transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            platform_id TEXT NOT NULL,
            transaction_type TEXT NOT NULL,   -- 'topup' | 'reveal'
            amount INTEGER NOT NULL,          -- cents; negative for debits
            balance_after INTEGER NOT NULL,   -- cents, snapshot at write time
            transaction_signature TEXT,       -- on-chain signature for topups
            description TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        -- Consumed on-chain payment signatures. The primary key is the
        -- topup dedup guard.
        CREATE TABLE credit_topups (
            chain_signature TEXT PRIMARY KEY,
            platform_id TEXT NOT NULL,
            amount INTEGER NOT NULL,          -- cents
            created_at INTEGER NOT NULL
        );

        -- Indexes for common queries
        CREATE INDEX idx_grants_asset ON access_grants(asset_id);
        CREATE INDEX idx_sessions_platform ON access_sessions(platform_id);
        CREATE INDEX idx_sessions_asset ON access_sessions(asset_id);
        CREATE INDEX idx_transactions_platform ON credit_transactions(platform_id);
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"encrypted_assets".to_string()));
        assert!(tables.contains(&"access_grants".to_string()));
        assert!(tables.contains(&"access_sessions".to_string()));
        assert!(tables.contains(&"platform_accounts".to_string()));
        assert!(tables.contains(&"credit_transactions".to_string()));
        assert!(tables.contains(&"credit_topups".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row(
                "SELECT MAX(version) FROM schema_migrations",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }
}
