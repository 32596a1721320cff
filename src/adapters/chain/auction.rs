//! Vickrey Auction Contract Interactions
//!
//! Implements the `AuctionLedger` port against the sealed-bid
//! second-price auction contract. The contract address comes from
//! `config.toml` and is validated on-chain at startup.
//!
//! Sealed bids are committed as `keccak256(uint256 value ++ nonce)`
//! using Solidity packed encoding: the bid value is a 32-byte
//! big-endian word, the nonce its raw UTF-8 bytes. The same `(value,
//! nonce)` pair is later revealed in clear for the contract to verify.

use std::sync::Arc;

use alloy::primitives::{keccak256, Address, Bytes, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::{info, instrument};

use crate::domain::AuctionTimings;
use crate::ports::ledger::{AuctionLedger, SealedBid, TxOutcome};

use super::provider::LedgerProvider;

sol! {
    function startAuction(uint256 energyAmount);
    function bid(bytes32 blindedBid) payable;
    function reveal(uint256 value, string nonce);
    function closeAuction();

    function biddingStart() returns (uint256);
    function biddingEnd() returns (uint256);
    function revealEnd() returns (uint256);
    function highestBidder() returns (address);
    function secondHighestBid() returns (uint256);
    function energyAmount() returns (uint256);
    function seller() returns (address);
}

/// Implements the auction ledger operations via alloy-rs 0.9.
///
/// All mutating calls are signed transactions awaited to receipt;
/// getters are `eth_call` reads against contract state.
pub struct VickreyAuction {
    /// Shared ledger RPC provider.
    provider: Arc<LedgerProvider>,
    /// Auction contract address from config.
    contract: Address,
    /// Gas limit applied to every mutating transaction.
    gas_limit: u64,
    /// Cached lowercase hex form of the signing account.
    account_hex: String,
}

impl VickreyAuction {
    /// Create and validate the auction contract binding.
    ///
    /// Validates that the contract address has deployed code on-chain.
    /// This prevents misconfiguration from silently failing at runtime.
    #[instrument(skip_all)]
    pub async fn new(
        provider: Arc<LedgerProvider>,
        contract: Address,
        gas_limit: u64,
    ) -> Result<Self> {
        let inner = provider.inner();

        let code = inner
            .get_code_at(contract)
            .await
            .context("Failed to query code for auction contract")?;

        if code.is_empty() {
            bail!(
                "Auction contract at {contract} has no deployed code — check config.toml"
            );
        }

        info!(address = %contract, "Validated auction contract on-chain");

        let account_hex = format!("{:#x}", provider.account());

        Ok(Self {
            provider,
            contract,
            gas_limit,
            account_hex,
        })
    }

    /// Read a uint256 slot from the contract via `eth_call`.
    async fn read_u256(&self, calldata: Vec<u8>, what: &str) -> Result<U256> {
        let inner = self.provider.inner();
        let result = inner
            .call(
                &TransactionRequest::default()
                    .to(self.contract)
                    .input(Bytes::from(calldata).into()),
            )
            .await
            .with_context(|| format!("{what} call failed"))?;
        Ok(U256::from_be_slice(&result))
    }

    /// Read an address slot from the contract via `eth_call`.
    async fn read_address(&self, calldata: Vec<u8>, what: &str) -> Result<Address> {
        let inner = self.provider.inner();
        let result = inner
            .call(
                &TransactionRequest::default()
                    .to(self.contract)
                    .input(Bytes::from(calldata).into()),
            )
            .await
            .with_context(|| format!("{what} call failed"))?;
        if result.len() < 32 {
            bail!("{what} returned short data ({} bytes)", result.len());
        }
        Ok(Address::from_slice(&result[12..32]))
    }

    /// Submit a signed transaction to the contract and await the receipt.
    async fn submit(
        &self,
        calldata: Vec<u8>,
        value_wei: u128,
        what: &str,
    ) -> Result<TxOutcome> {
        let inner = self.provider.inner();

        let mut tx = TransactionRequest::default()
            .to(self.contract)
            .input(Bytes::from(calldata).into())
            .gas_limit(self.gas_limit);
        if value_wei > 0 {
            tx = tx.value(U256::from(value_wei));
        }

        let pending = inner
            .send_transaction(tx)
            .await
            .with_context(|| format!("{what} transaction rejected"))?;

        let receipt = pending
            .get_receipt()
            .await
            .with_context(|| format!("{what} receipt not found"))?;

        if !receipt.status() {
            bail!("{what} transaction reverted ({})", receipt.transaction_hash);
        }

        Ok(TxOutcome {
            tx_hash: format!("{:#x}", receipt.transaction_hash),
        })
    }
}

/// Compute the sealed-bid commitment for a `(value, nonce)` pair.
///
/// Matches Solidity `keccak256(abi.encodePacked(uint256(value), nonce))`.
pub fn seal_bid(value_wei: u128, nonce: &str) -> [u8; 32] {
    let value = U256::from(value_wei);
    let mut packed = Vec::with_capacity(32 + nonce.len());
    packed.extend_from_slice(&value.to_be_bytes::<32>());
    packed.extend_from_slice(nonce.as_bytes());
    keccak256(&packed).0
}

#[async_trait]
impl AuctionLedger for VickreyAuction {
    #[instrument(skip(self))]
    async fn start_auction(&self, energy_units: u64) -> Result<TxOutcome> {
        let calldata = startAuctionCall {
            energyAmount: U256::from(energy_units),
        }
        .abi_encode();
        self.submit(calldata, 0, "startAuction").await
    }

    #[instrument(skip(self), fields(value_wei))]
    async fn bid(&self, value_wei: u128, nonce: &str) -> Result<SealedBid> {
        let commitment = seal_bid(value_wei, nonce);
        let calldata = bidCall {
            blindedBid: commitment.into(),
        }
        .abi_encode();
        // The deposit rides along as tx value; excess refunds on reveal
        let outcome = self.submit(calldata, value_wei, "bid").await?;
        Ok(SealedBid {
            commitment,
            tx_hash: outcome.tx_hash,
        })
    }

    #[instrument(skip(self), fields(value_wei))]
    async fn reveal(&self, value_wei: u128, nonce: &str) -> Result<TxOutcome> {
        let calldata = revealCall {
            value: U256::from(value_wei),
            nonce: nonce.to_string(),
        }
        .abi_encode();
        self.submit(calldata, 0, "reveal").await
    }

    #[instrument(skip(self))]
    async fn close_auction(&self) -> Result<TxOutcome> {
        let calldata = closeAuctionCall {}.abi_encode();
        self.submit(calldata, 0, "closeAuction").await
    }

    async fn timings(&self) -> Result<AuctionTimings> {
        let bidding_start = self
            .read_u256(biddingStartCall {}.abi_encode(), "biddingStart")
            .await?;
        let bidding_end = self
            .read_u256(biddingEndCall {}.abi_encode(), "biddingEnd")
            .await?;
        let reveal_end = self
            .read_u256(revealEndCall {}.abi_encode(), "revealEnd")
            .await?;

        Ok(AuctionTimings {
            bidding_start: bidding_start.to::<u64>(),
            bidding_end: bidding_end.to::<u64>(),
            reveal_end: reveal_end.to::<u64>(),
        })
    }

    async fn highest_bidder(&self) -> Result<String> {
        let addr = self
            .read_address(highestBidderCall {}.abi_encode(), "highestBidder")
            .await?;
        Ok(format!("{addr:#x}"))
    }

    async fn second_highest_bid(&self) -> Result<u128> {
        let raw = self
            .read_u256(secondHighestBidCall {}.abi_encode(), "secondHighestBid")
            .await?;
        Ok(raw.to::<u128>())
    }

    async fn energy_amount(&self) -> Result<u64> {
        let raw = self
            .read_u256(energyAmountCall {}.abi_encode(), "energyAmount")
            .await?;
        Ok(raw.to::<u64>())
    }

    async fn seller(&self) -> Result<String> {
        let addr = self
            .read_address(sellerCall {}.abi_encode(), "seller")
            .await?;
        Ok(format!("{addr:#x}"))
    }

    async fn balance_eth(&self) -> Result<f64> {
        let inner = self.provider.inner();
        let wei = inner
            .get_balance(self.provider.account())
            .await
            .context("Balance query failed")?;
        // f64 precision is fine for reporting; settlement stays in wei
        Ok(wei.to::<u128>() as f64 / 1e18)
    }

    fn account(&self) -> &str {
        &self.account_hex
    }

    async fn is_healthy(&self) -> bool {
        self.provider.is_healthy().await
    }
}
