//! Configuration for the Gateway.

use zkpfp_core::{NdaTemplate, UsdCents, SESSION_TTL_MS};

/// Default price of one reveal: $0.50.
pub const DEFAULT_REVEAL_COST: UsdCents = UsdCents::cents(50);

/// Default freshness window for owner-signed commands: 5 minutes.
///
/// An owner command (grant toggle, burn) carries its issue timestamp in
/// the signed message; outside this window the signature is treated as a
/// replay and rejected.
pub const DEFAULT_COMMAND_FRESHNESS_MS: i64 = 5 * 60 * 1000;

/// Configuration for the Gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Price debited per reveal.
    pub reveal_cost: UsdCents,
    /// Consent session lifetime in milliseconds.
    pub session_ttl_ms: i64,
    /// Maximum age of an owner-signed command.
    pub command_freshness_ms: i64,
    /// NDA template used for consent documents.
    pub nda_template: NdaTemplate,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            reveal_cost: DEFAULT_REVEAL_COST,
            session_ttl_ms: SESSION_TTL_MS,
            command_freshness_ms: DEFAULT_COMMAND_FRESHNESS_MS,
            nda_template: NdaTemplate::default(),
        }
    }
}
