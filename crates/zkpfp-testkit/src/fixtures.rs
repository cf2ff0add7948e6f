//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a gateway over an in-memory
//! store with a registered platform and deterministic owner/viewer
//! identities.

use std::sync::Arc;

use zkpfp_core::{
    consent_message, AccessSession, AssetId, EncryptedAsset, Keypair, PlatformAccount, UsdCents,
    IV_LEN, SYMMETRIC_KEY_LEN,
};
use zkpfp_gateway::{toggle_message, Gateway, GatewayConfig, SignNdaRequest, TopupReceipt};
use zkpfp_proof::{BindingProver, ProofError, ProofSystem};
use zkpfp_store::MemoryStore;

/// The raw API key the fixture's platform is registered with.
pub const FIXTURE_API_KEY: &str = "pk_test_zkpfp_fixture";

/// A reference point in time for deterministic tests: 2023-11-14T22:13:20Z.
pub const FIXTURE_EPOCH_MS: i64 = 1_700_000_000_000;

/// A gateway over an in-memory store with a registered platform and
/// deterministic owner/viewer keypairs.
pub struct TestFixture {
    pub gateway: Gateway<MemoryStore>,
    pub owner: Keypair,
    pub viewer: Keypair,
    pub platform: PlatformAccount,
    pub api_key: String,
}

impl TestFixture {
    /// Create a fixture with the default configuration.
    pub async fn new() -> Self {
        Self::with_config(GatewayConfig::default()).await
    }

    /// Create a fixture with a custom gateway configuration.
    pub async fn with_config(config: GatewayConfig) -> Self {
        let gateway = Gateway::new(MemoryStore::new(), Arc::new(BindingProver::new()), config);
        let platform = gateway
            .register_platform_at("FixturePlatform", FIXTURE_API_KEY, FIXTURE_EPOCH_MS)
            .await
            .expect("fixture platform registers");
        Self {
            gateway,
            owner: Keypair::from_seed(&[0x11; 32]),
            viewer: Keypair::from_seed(&[0x22; 32]),
            platform,
            api_key: FIXTURE_API_KEY.to_string(),
        }
    }

    /// Create an asset owned by the fixture owner with an active grant for
    /// the fixture platform.
    pub async fn granted_asset_at(&self, image: &[u8], now: i64) -> EncryptedAsset {
        let created = self
            .gateway
            .create_asset_at(image, &self.owner.address(), now)
            .await
            .expect("fixture asset encrypts");
        let asset_id = created.asset.asset_id.clone();
        let message = toggle_message(&asset_id, &self.platform.platform_id, true, now);
        let signature = self.owner.sign(message.as_bytes());
        self.gateway
            .toggle_grant_at(&asset_id, &self.platform.platform_id, true, &signature, now, now)
            .await
            .expect("fixture grant toggles");
        created.asset
    }

    /// Walk the viewer through NDA fetch and consent signing.
    pub async fn signed_session_at(&self, asset_id: &AssetId, now: i64) -> AccessSession {
        let nda = self
            .gateway
            .fetch_nda_template_at(asset_id, &self.platform.platform_id, &self.viewer.address(), now)
            .await
            .expect("fixture NDA populates");
        let signature = self.viewer.sign(consent_message(&nda.hash).as_bytes());
        self.gateway
            .sign_nda_at(
                SignNdaRequest {
                    asset_id: asset_id.clone(),
                    platform_id: self.platform.platform_id.clone(),
                    viewer: self.viewer.address(),
                    nda_hash: nda.hash,
                    consent_given: true,
                    signature,
                    signer_ip: None,
                    signer_user_agent: None,
                    chain_memo_signature: None,
                },
                now,
            )
            .await
            .expect("fixture session issues")
    }

    /// Top up the fixture platform.
    pub async fn fund_at(&self, amount: UsdCents, chain_signature: &str, now: i64) -> TopupReceipt {
        self.gateway
            .topup_at(&self.api_key, amount, chain_signature, now)
            .await
            .expect("fixture top-up applies")
    }
}

/// A proof backend that always fails, for exercising the degraded
/// proof-less asset path.
pub struct FailingProver;

impl ProofSystem for FailingProver {
    fn generate(
        &self,
        _symmetric_key: &[u8; SYMMETRIC_KEY_LEN],
        _iv: &[u8; IV_LEN],
        _owner: &zkpfp_core::WalletAddress,
    ) -> zkpfp_proof::Result<zkpfp_core::ProofBundle> {
        Err(ProofError::Unavailable("testkit failing prover".into()))
    }

    fn verify(&self, _proof: &zkpfp_core::ZkProof, _public_signals: &[String]) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_flow_end_to_end() {
        let fx = TestFixture::new().await;
        let asset = fx.granted_asset_at(b"image", FIXTURE_EPOCH_MS).await;
        let session = fx.signed_session_at(&asset.asset_id, FIXTURE_EPOCH_MS).await;
        fx.fund_at(UsdCents::dollars(1), "fixture-sig", FIXTURE_EPOCH_MS).await;

        let reveal = fx
            .gateway
            .reveal_at(&fx.api_key, &session.session_id, FIXTURE_EPOCH_MS + 1)
            .await
            .unwrap();
        assert_eq!(reveal.remaining_balance, UsdCents::cents(50));
    }

    #[tokio::test]
    async fn test_failing_prover_degrades_asset_creation() {
        let gateway = Gateway::new(
            MemoryStore::new(),
            Arc::new(FailingProver),
            GatewayConfig::default(),
        );
        let owner = Keypair::from_seed(&[0x11; 32]);
        let created = gateway
            .create_asset_at(b"image", &owner.address(), FIXTURE_EPOCH_MS)
            .await
            .unwrap();
        assert!(!created.asset.proof.is_present());
    }
}
