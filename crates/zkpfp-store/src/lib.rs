//! # zkPFP Store
//!
//! Storage abstraction for the zkPFP gateway. Provides a trait-based
//! interface for protocol records with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The store module abstracts persistence behind the [`Store`] trait,
//! allowing the gateway to be storage-agnostic. The primary implementation
//! is [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`TopupOutcome`] / [`DebitOutcome`] - Ledger write results
//!
//! ## Usage
//!
//! ```rust,no_run
//! use zkpfp_store::{SqliteStore, Store};
//! use zkpfp_core::AssetId;
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("zkpfp.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     let asset = store.get_asset(&AssetId::new("some-asset")).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Outcome enums**: duplicate topups and insufficient funds are return
//!   values, not errors
//! - **Atomic ledger**: balance updates and ledger rows commit together
//! - **Append-only ledger**: entries are never mutated or deleted
//! - **Audit survives burn**: deleting an asset keeps its sessions and
//!   ledger rows

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{DebitOutcome, LedgerUpdate, Store, TopupOutcome};
