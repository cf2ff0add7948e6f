//! The Gateway: unified server-side API for the zkPFP protocol.
//!
//! The Gateway brings together asset registration, the grant registry,
//! consent session issuance, the credit ledger, and the metered reveal
//! into a cohesive interface over a [`Store`] backend.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zkpfp_core::{
    consent_message, encrypt_image_with, sha256_hex, AccessGrant, AccessSession, AssetId,
    CreditTransaction, Ed25519Signature, Ed25519Verifier, EncryptedAsset, PlatformAccount, PlatformId, PopulatedNda, ProofAttachment, SessionId, Sha256Hash,
    SignatureVerifier, UsdCents, WalletAddress,
};
use zkpfp_proof::ProofSystem;
use zkpfp_store::{DebitOutcome, Store, TopupOutcome};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};

/// An asset freshly registered by [`Gateway::create_asset`].
///
/// The record is persisted; the ciphertext is handed back to the caller
/// for blob upload at `asset.ciphertext_ref`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedAsset {
    pub asset: EncryptedAsset,
    /// Base64 AES-256-GCM ciphertext, not stored in the record.
    pub ciphertext: String,
}

/// Request payload for consent signing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignNdaRequest {
    pub asset_id: AssetId,
    pub platform_id: PlatformId,
    pub viewer: WalletAddress,
    /// SHA-256 hex of the populated NDA the viewer saw.
    pub nda_hash: String,
    pub consent_given: bool,
    /// Viewer signature over the canonical consent message.
    pub signature: Ed25519Signature,
    pub signer_ip: Option<String>,
    pub signer_user_agent: Option<String>,
    pub chain_memo_signature: Option<String>,
}

/// Result of a successful top-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopupReceipt {
    pub platform_id: PlatformId,
    pub previous_balance: UsdCents,
    pub amount: UsdCents,
    pub new_balance: UsdCents,
    pub transaction_signature: String,
}

/// Audit metadata echoed with every reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealAudit {
    pub session_id: SessionId,
    pub viewer: WalletAddress,
    pub nda_hash: String,
    pub signing_timestamp: i64,
    pub chain_memo_signature: Option<String>,
    pub session_expires_at: i64,
}

/// Encrypted material plus accounting, the full reveal response.
///
/// Never contains plaintext; decryption is the viewer's own step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reveal {
    pub ciphertext_ref: String,
    pub iv: String,
    pub wrapped_key: String,
    pub commitment: Sha256Hash,
    pub proof_attached: bool,
    pub audit: RevealAudit,
    pub cost: UsdCents,
    pub remaining_balance: UsdCents,
}

/// Canonical message an owner signs to toggle a grant.
///
/// Naming the action, asset, and platform prevents replaying one signed
/// toggle against another grant; the issue timestamp bounds replay in time.
pub fn toggle_message(
    asset_id: &AssetId,
    platform_id: &PlatformId,
    active: bool,
    issued_at: i64,
) -> String {
    let action = if active { "grant" } else { "revoke" };
    format!(
        "zkPFP Access Control\n\nAction: {action}\nAsset: {asset_id}\nPlatform: {platform_id}\nIssued at: {issued_at}"
    )
}

/// Canonical message an owner signs to burn an asset.
pub fn burn_message(asset_id: &AssetId, issued_at: i64) -> String {
    format!("zkPFP Access Control\n\nAction: burn\nAsset: {asset_id}\nIssued at: {issued_at}")
}

/// The main Gateway struct.
///
/// Provides a unified API for:
/// - Registering encrypted assets (with proof attempt)
/// - Toggling per-platform grants (owner-signed)
/// - Issuing consent sessions (viewer-signed NDA)
/// - Ledger top-ups and the metered reveal
pub struct Gateway<S: Store> {
    /// The storage backend.
    store: Arc<S>,
    /// The proof backend used at asset creation.
    prover: Arc<dyn ProofSystem>,
    /// Checks owner and viewer signatures over raw bytes. The curve lives
    /// here, not in the gateway.
    verifier: Arc<dyn SignatureVerifier>,
    /// Configuration.
    config: GatewayConfig,
}

impl<S: Store> Gateway<S> {
    /// Create a new gateway instance verifying signatures as Ed25519.
    pub fn new(store: S, prover: Arc<dyn ProofSystem>, config: GatewayConfig) -> Self {
        Self::with_verifier(store, prover, Arc::new(Ed25519Verifier), config)
    }

    /// Create a gateway with a custom signature verifier backend.
    pub fn with_verifier(
        store: S,
        prover: Arc<dyn ProofSystem>,
        verifier: Arc<dyn SignatureVerifier>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            store: Arc::new(store),
            prover,
            verifier,
            config,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Platform Registration
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a platform account. Only the SHA-256 of the API key is
    /// stored.
    pub async fn register_platform(&self, name: &str, api_key: &str) -> Result<PlatformAccount> {
        self.register_platform_at(name, api_key, now_millis()).await
    }

    pub async fn register_platform_at(
        &self,
        name: &str,
        api_key: &str,
        now: i64,
    ) -> Result<PlatformAccount> {
        if name.is_empty() {
            return Err(GatewayError::Validation("platform name is required".into()));
        }
        if api_key.is_empty() {
            return Err(GatewayError::Validation("API key is required".into()));
        }

        let api_key_hash = sha256_hex(api_key.as_bytes());
        if self
            .store
            .get_platform_by_api_key_hash(&api_key_hash)
            .await?
            .is_some()
        {
            return Err(GatewayError::Conflict("API key already registered".into()));
        }

        let account = PlatformAccount {
            platform_id: PlatformId::generate(),
            platform_name: name.to_string(),
            api_key_hash,
            credit_balance: UsdCents::ZERO,
            is_active: true,
            created_at: now,
        };
        self.store.insert_platform(&account).await?;
        tracing::info!(platform = %account.platform_id, name, "platform registered");
        Ok(account)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Asset Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt an image for `owner` and persist the asset record.
    ///
    /// Proof generation is attempted through the configured backend; on
    /// failure the asset is created proof-less rather than aborting.
    pub async fn create_asset(&self, image: &[u8], owner: &WalletAddress) -> Result<CreatedAsset> {
        self.create_asset_at(image, owner, now_millis()).await
    }

    pub async fn create_asset_at(
        &self,
        image: &[u8],
        owner: &WalletAddress,
        now: i64,
    ) -> Result<CreatedAsset> {
        if image.is_empty() {
            return Err(GatewayError::Validation("image is empty".into()));
        }

        let prover = self.prover.clone();
        let prover_owner = owner.clone();
        let (encrypted, proof) = encrypt_image_with(image, owner, None, |key, iv| {
            match prover.generate(key, iv, &prover_owner) {
                Ok(bundle) => ProofAttachment::Present(bundle),
                Err(e) => {
                    tracing::warn!(owner = %prover_owner, error = %e,
                        "proof generation failed, creating asset without proof");
                    ProofAttachment::Absent
                }
            }
        })?;

        let asset_id = AssetId::generate();
        let asset = EncryptedAsset {
            ciphertext_ref: format!("assets/{asset_id}"),
            asset_id,
            owner: owner.clone(),
            iv: encrypted.iv,
            wrapped_key: encrypted.wrapped_key,
            commitment: encrypted.commitment,
            proof,
            created_at: now,
        };
        self.store.insert_asset(&asset).await?;
        tracing::info!(asset = %asset.asset_id, owner = %owner,
            proof_attached = asset.proof.is_present(), "asset created");

        Ok(CreatedAsset {
            asset,
            ciphertext: encrypted.ciphertext,
        })
    }

    /// Get an asset record by id.
    pub async fn asset(&self, id: &AssetId) -> Result<Option<EncryptedAsset>> {
        Ok(self.store.get_asset(id).await?)
    }

    /// Burn an asset: the only delete in the system, owner-signed.
    pub async fn burn_asset(
        &self,
        asset_id: &AssetId,
        signature: &Ed25519Signature,
        issued_at: i64,
    ) -> Result<()> {
        self.burn_asset_at(asset_id, signature, issued_at, now_millis())
            .await
    }

    pub async fn burn_asset_at(
        &self,
        asset_id: &AssetId,
        signature: &Ed25519Signature,
        issued_at: i64,
        now: i64,
    ) -> Result<()> {
        let asset = self
            .store
            .get_asset(asset_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("asset {asset_id}")))?;

        let message = burn_message(asset_id, issued_at);
        self.verify_owner_command(&asset.owner, &message, signature, issued_at, now)?;

        self.store.delete_asset(asset_id).await?;
        tracing::info!(asset = %asset_id, owner = %asset.owner, "asset burned");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grant Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Toggle the grant for `(asset_id, platform_id)`, authenticated by an
    /// owner signature over [`toggle_message`]. Idempotent.
    pub async fn toggle_grant(
        &self,
        asset_id: &AssetId,
        platform_id: &PlatformId,
        active: bool,
        signature: &Ed25519Signature,
        issued_at: i64,
    ) -> Result<AccessGrant> {
        self.toggle_grant_at(asset_id, platform_id, active, signature, issued_at, now_millis())
            .await
    }

    pub async fn toggle_grant_at(
        &self,
        asset_id: &AssetId,
        platform_id: &PlatformId,
        active: bool,
        signature: &Ed25519Signature,
        issued_at: i64,
        now: i64,
    ) -> Result<AccessGrant> {
        let asset = self
            .store
            .get_asset(asset_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("asset {asset_id}")))?;
        if self.store.get_platform(platform_id).await?.is_none() {
            return Err(GatewayError::NotFound(format!("platform {platform_id}")));
        }

        let message = toggle_message(asset_id, platform_id, active, issued_at);
        self.verify_owner_command(&asset.owner, &message, signature, issued_at, now)?;

        let grant = self
            .store
            .upsert_grant(asset_id, platform_id, active, now)
            .await?;
        tracing::info!(asset = %asset_id, platform = %platform_id, active,
            "grant toggled");
        Ok(grant)
    }

    /// List all grants on an asset, the owner's manage-sharing view.
    pub async fn list_grants(&self, asset_id: &AssetId) -> Result<Vec<AccessGrant>> {
        Ok(self.store.list_grants(asset_id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Consent Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Populate the NDA for a concrete (asset, platform, viewer) at the
    /// current time. The viewer signs the consent message over the
    /// returned hash.
    pub async fn fetch_nda_template(
        &self,
        asset_id: &AssetId,
        platform_id: &PlatformId,
        viewer: &WalletAddress,
    ) -> Result<PopulatedNda> {
        self.fetch_nda_template_at(asset_id, platform_id, viewer, now_millis())
            .await
    }

    pub async fn fetch_nda_template_at(
        &self,
        asset_id: &AssetId,
        platform_id: &PlatformId,
        viewer: &WalletAddress,
        now: i64,
    ) -> Result<PopulatedNda> {
        let asset = self
            .store
            .get_asset(asset_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("asset {asset_id}")))?;
        let platform = self
            .store
            .get_platform(platform_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("platform {platform_id}")))?;

        Ok(self
            .config
            .nda_template
            .populate(&asset.owner, viewer, &platform.platform_name, now))
    }

    /// Issue a consent session from a signed NDA.
    ///
    /// Preconditions are checked in order, each a distinct failure:
    /// platform active, grant active, consent given, signature valid.
    pub async fn sign_nda(&self, request: SignNdaRequest) -> Result<AccessSession> {
        self.sign_nda_at(request, now_millis()).await
    }

    pub async fn sign_nda_at(&self, request: SignNdaRequest, now: i64) -> Result<AccessSession> {
        if request.nda_hash.is_empty() {
            return Err(GatewayError::Validation("nda_hash is required".into()));
        }

        let platform = self
            .store
            .get_platform(&request.platform_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("platform {}", request.platform_id)))?;
        if !platform.is_active {
            return Err(GatewayError::Authorization(
                "platform account is inactive".into(),
            ));
        }

        let grant = self
            .store
            .get_grant(&request.asset_id, &request.platform_id)
            .await?;
        if !grant.is_some_and(|g| g.is_active) {
            return Err(GatewayError::Authorization(
                "no active grant for this asset and platform".into(),
            ));
        }

        if !request.consent_given {
            return Err(GatewayError::Authorization("consent was not given".into()));
        }

        let message = consent_message(&request.nda_hash);
        let viewer_key = request.viewer.key_bytes().map_err(|_| {
            GatewayError::Authentication("viewer identity is not a valid public key".into())
        })?;
        if !self
            .verifier
            .verify(message.as_bytes(), request.signature.as_ref(), &viewer_key)
        {
            return Err(GatewayError::Authentication(
                "invalid viewer signature".into(),
            ));
        }

        let session = AccessSession {
            session_id: SessionId::generate(),
            asset_id: request.asset_id,
            platform_id: request.platform_id,
            viewer: request.viewer,
            nda_message: message,
            nda_signature: request.signature.to_base58(),
            nda_hash: request.nda_hash,
            consent_given: true,
            signer_ip: request.signer_ip.unwrap_or_else(|| "unknown".into()),
            signer_user_agent: request.signer_user_agent.unwrap_or_else(|| "unknown".into()),
            signing_timestamp: now,
            chain_memo_signature: request.chain_memo_signature,
            expires_at: now + self.config.session_ttl_ms,
        };
        self.store.insert_session(&session).await?;
        tracing::info!(session = %session.session_id, asset = %session.asset_id,
            platform = %session.platform_id, viewer = %session.viewer,
            expires_at = session.expires_at, "consent session issued");
        Ok(session)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Credit a platform for an on-chain payment. Idempotent on the chain
    /// signature: a replay is a [`GatewayError::Conflict`], never a double
    /// credit.
    pub async fn topup(
        &self,
        api_key: &str,
        amount: UsdCents,
        chain_signature: &str,
    ) -> Result<TopupReceipt> {
        self.topup_at(api_key, amount, chain_signature, now_millis())
            .await
    }

    pub async fn topup_at(
        &self,
        api_key: &str,
        amount: UsdCents,
        chain_signature: &str,
        now: i64,
    ) -> Result<TopupReceipt> {
        if !amount.is_positive() {
            return Err(GatewayError::Validation(
                "top-up amount must be positive".into(),
            ));
        }
        if chain_signature.is_empty() {
            return Err(GatewayError::Validation(
                "chain signature is required".into(),
            ));
        }

        let platform = self.authenticate_platform(api_key).await?;
        let description = format!("Credit top-up of {amount}");
        match self
            .store
            .apply_topup(&platform.platform_id, amount, chain_signature, &description, now)
            .await?
        {
            TopupOutcome::Applied(update) => {
                tracing::info!(platform = %platform.platform_id, amount = %amount,
                    balance = %update.new_balance, "top-up applied");
                Ok(TopupReceipt {
                    platform_id: platform.platform_id,
                    previous_balance: update.previous_balance,
                    amount,
                    new_balance: update.new_balance,
                    transaction_signature: chain_signature.to_string(),
                })
            }
            TopupOutcome::DuplicateSignature => Err(GatewayError::Conflict(
                "payment signature already consumed".into(),
            )),
        }
    }

    /// A platform's ledger history, newest first.
    pub async fn transactions(&self, api_key: &str) -> Result<Vec<CreditTransaction>> {
        let platform = self.authenticate_platform(api_key).await?;
        Ok(self.store.list_transactions(&platform.platform_id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reveal
    // ─────────────────────────────────────────────────────────────────────────

    /// The metered reveal: authenticate, validate the session, re-check the
    /// grant, debit, and return encrypted material.
    ///
    /// The validation sequence is fixed and each step fails distinctly:
    /// (1) platform authenticated and active, (2) sufficient credit,
    /// (3) session exists and belongs to the platform, (4) session not
    /// expired, (5) consent recorded, (6) grant still active. The grant is
    /// re-read fresh so a revoke after signing is honored. Sessions carry
    /// no single-use flag: repeat reveals inside the window are allowed
    /// and each is metered.
    pub async fn reveal(&self, api_key: &str, session_id: &SessionId) -> Result<Reveal> {
        self.reveal_at(api_key, session_id, now_millis()).await
    }

    pub async fn reveal_at(
        &self,
        api_key: &str,
        session_id: &SessionId,
        now: i64,
    ) -> Result<Reveal> {
        let cost = self.config.reveal_cost;

        let platform = self.authenticate_platform(api_key).await?;

        // Credit is reported before any session work proceeds.
        if platform.credit_balance < cost {
            return Err(GatewayError::InsufficientFunds {
                balance: platform.credit_balance,
                required: cost,
            });
        }

        let session = self
            .store
            .get_session(session_id)
            .await?
            .filter(|s| s.platform_id == platform.platform_id)
            .ok_or_else(|| GatewayError::NotFound(format!("session {session_id}")))?;

        if session.is_expired(now) {
            return Err(GatewayError::Expired(
                "session expired, re-sign required".into(),
            ));
        }

        if !session.consent_given {
            return Err(GatewayError::Authorization(
                "session recorded no consent".into(),
            ));
        }

        // Fresh read, never from session state: a revoke after signing
        // must block this reveal.
        let grant = self
            .store
            .get_grant(&session.asset_id, &platform.platform_id)
            .await?;
        if !grant.is_some_and(|g| g.is_active) {
            return Err(GatewayError::Authorization(
                "grant has been revoked".into(),
            ));
        }

        let asset = self
            .store
            .get_asset(&session.asset_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("asset {}", session.asset_id)))?;

        let description = format!("Reveal of asset {} via session {}", asset.asset_id, session_id);
        let update = match self
            .store
            .apply_debit(&platform.platform_id, cost, &description, now)
            .await?
        {
            DebitOutcome::Applied(update) => update,
            DebitOutcome::InsufficientFunds { balance, required } => {
                return Err(GatewayError::InsufficientFunds { balance, required })
            }
        };

        tracing::info!(session = %session_id, asset = %asset.asset_id,
            platform = %platform.platform_id, cost = %cost,
            balance = %update.new_balance, "reveal granted");

        Ok(Reveal {
            ciphertext_ref: asset.ciphertext_ref,
            iv: asset.iv,
            wrapped_key: asset.wrapped_key,
            commitment: asset.commitment,
            proof_attached: asset.proof.is_present(),
            audit: RevealAudit {
                session_id: session.session_id,
                viewer: session.viewer,
                nda_hash: session.nda_hash,
                signing_timestamp: session.signing_timestamp,
                chain_memo_signature: session.chain_memo_signature,
                session_expires_at: session.expires_at,
            },
            cost,
            remaining_balance: update.new_balance,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    async fn authenticate_platform(&self, api_key: &str) -> Result<PlatformAccount> {
        let hash = sha256_hex(api_key.as_bytes());
        let platform = self
            .store
            .get_platform_by_api_key_hash(&hash)
            .await?
            .ok_or_else(|| GatewayError::Authentication("unknown API key".into()))?;
        if !platform.is_active {
            return Err(GatewayError::Authorization(
                "platform account is inactive".into(),
            ));
        }
        Ok(platform)
    }

    fn verify_owner_command(
        &self,
        owner: &WalletAddress,
        message: &str,
        signature: &Ed25519Signature,
        issued_at: i64,
        now: i64,
    ) -> Result<()> {
        if (now - issued_at).abs() > self.config.command_freshness_ms {
            return Err(GatewayError::Expired("command signature is stale".into()));
        }
        let key = owner.key_bytes().map_err(|_| {
            GatewayError::Authentication("owner identity is not a valid public key".into())
        })?;
        if !self
            .verifier
            .verify(message.as_bytes(), signature.as_ref(), &key)
        {
            return Err(GatewayError::Authentication(
                "invalid owner signature".into(),
            ));
        }
        Ok(())
    }
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
    fn test_toggle_message_names_everything() {
        let msg = toggle_message(&AssetId::new("a1"), &PlatformId::new("p1"), false, 42);
        assert!(msg.contains("Action: revoke"));
        assert!(msg.contains("Asset: a1"));
        assert!(msg.contains("Platform: p1"));
        assert!(msg.contains("Issued at: 42"));

        let grant = toggle_message(&AssetId::new("a1"), &PlatformId::new("p1"), true, 42);
        assert!(grant.contains("Action: grant"));
        assert_ne!(msg, grant);
    }

    #[test]
    fn test_burn_message_distinct_from_toggle() {
        let burn = burn_message(&AssetId::new("a1"), 42);
        assert!(burn.contains("Action: burn"));
        assert_ne!(
            burn,
            toggle_message(&AssetId::new("a1"), &PlatformId::new("p1"), false, 42)
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.reveal_cost, UsdCents::cents(50));
        assert_eq!(config.session_ttl_ms, 60 * 60 * 1000);
        assert_eq!(config.command_freshness_ms, 5 * 60 * 1000);
    }
}
