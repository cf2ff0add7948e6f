//! # zkPFP Testkit
//!
//! Testing utilities for the zkPFP protocol.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a gateway over an in-memory store with a registered
//!   platform and deterministic owner/viewer identities
//! - **Generators**: proptest strategies for protocol types
//! - **FailingProver**: a proof backend that always fails, for exercising
//!   the degraded proof-less asset path
//!
//! ## Test Fixtures
//!
//! Quickly set up a full protocol scenario:
//!
//! ```rust,no_run
//! use zkpfp_core::UsdCents;
//! use zkpfp_testkit::{TestFixture, FIXTURE_EPOCH_MS};
//!
//! async fn example() {
//!     let fx = TestFixture::new().await;
//!     let asset = fx.granted_asset_at(b"image", FIXTURE_EPOCH_MS).await;
//!     let session = fx.signed_session_at(&asset.asset_id, FIXTURE_EPOCH_MS).await;
//!     fx.fund_at(UsdCents::dollars(1), "sig", FIXTURE_EPOCH_MS).await;
//!     let reveal = fx.gateway
//!         .reveal_at(&fx.api_key, &session.session_id, FIXTURE_EPOCH_MS + 1)
//!         .await
//!         .unwrap();
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{FailingProver, TestFixture, FIXTURE_API_KEY, FIXTURE_EPOCH_MS};
pub use generators::{arb_identity, arb_image, arb_iv, arb_key, arb_topup_amount};
