//! Proptest strategies for protocol types.

use proptest::prelude::*;
use zkpfp_core::{UsdCents, WalletAddress, IV_LEN, SYMMETRIC_KEY_LEN};

/// Arbitrary image payloads, empty through a few KiB.
pub fn arb_image() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..4096)
}

/// Base58-looking wallet identity strings.
pub fn arb_identity() -> impl Strategy<Value = WalletAddress> {
    "[1-9A-HJ-NP-Za-km-z]{32,44}".prop_map(WalletAddress::new)
}

/// Symmetric key material.
pub fn arb_key() -> impl Strategy<Value = [u8; SYMMETRIC_KEY_LEN]> {
    any::<[u8; SYMMETRIC_KEY_LEN]>()
}

/// AES-GCM IVs.
pub fn arb_iv() -> impl Strategy<Value = [u8; IV_LEN]> {
    any::<[u8; IV_LEN]>()
}

/// Positive USD amounts up to $1,000.00.
pub fn arb_topup_amount() -> impl Strategy<Value = UsdCents> {
    (1i64..=100_000).prop_map(UsdCents::cents)
}
