//! Ledger RPC Provider - alloy-rs 0.9 Connection Management
//!
//! Manages the signed connection to the ledger node via alloy-rs.
//! Validates RPC connectivity and the chain id at startup and exposes a
//! shared provider instance for all contract operations.
//!
//! In alloy 0.9, `ProviderBuilder::new().wallet(..).on_http()` returns a
//! complex filler type. We store it as a type-erased `dyn Provider` to
//! keep the API clean across the adapter layer.

use std::sync::Arc;

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::config::LedgerConfig;

/// Environment variable holding the coordinator's signing key.
pub const PRIVATE_KEY_ENV: &str = "GRIDMESH_PRIVATE_KEY";

/// Shared ledger RPC provider backed by alloy-rs 0.9.
///
/// All chain adapters share a single provider instance. The wallet
/// filler signs every mutating call with the account loaded from
/// `GRIDMESH_PRIVATE_KEY` — the key never appears in config or logs.
pub struct LedgerProvider {
    /// The alloy HTTP provider with wallet filler (type-erased).
    provider: Arc<dyn Provider + Send + Sync>,
    /// The signing account's address.
    account: Address,
}

impl LedgerProvider {
    /// Connect to the ledger RPC and validate the chain id.
    ///
    /// The RPC URL and expected chain id come from `config.toml`. A
    /// mismatched chain id or unreachable node is a fatal setup error.
    #[instrument(skip_all)]
    pub async fn connect(config: &LedgerConfig) -> Result<Self> {
        let key = std::env::var(PRIVATE_KEY_ENV)
            .with_context(|| format!("{PRIVATE_KEY_ENV} not set"))?;
        let signer: PrivateKeySigner = key
            .parse()
            .context("Invalid signing key in environment")?;
        let account = signer.address();
        let wallet = EthereumWallet::from(signer);

        let client = alloy::rpc::client::ClientBuilder::default()
            .http(config.rpc_url.parse().context("Invalid RPC URL")?)
            .boxed();
        let provider = ProviderBuilder::new().wallet(wallet).on_client(client);

        // Wrap in Arc<dyn Provider> for type erasure
        let provider: Arc<dyn Provider + Send + Sync> = Arc::new(provider);

        let chain_id = provider
            .get_chain_id()
            .await
            .context("Failed to query chain ID")?;

        if chain_id != config.chain_id {
            anyhow::bail!(
                "Expected chain_id={}, got {chain_id} — check ledger.rpc_url",
                config.chain_id
            );
        }

        info!(chain_id, account = %account, "Connected to ledger RPC");

        Ok(Self { provider, account })
    }

    /// Get a shared reference to the alloy provider (type-erased).
    pub fn inner(&self) -> Arc<dyn Provider + Send + Sync> {
        Arc::clone(&self.provider)
    }

    /// The signing account's address.
    pub fn account(&self) -> Address {
        self.account
    }

    /// Check if the RPC connection is healthy via a lightweight call.
    pub async fn is_healthy(&self) -> bool {
        self.provider.get_block_number().await.is_ok()
    }
}
