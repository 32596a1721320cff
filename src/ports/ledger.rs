//! Auction Ledger Port - Sealed-bid Auction Contract Interface
//!
//! Defines the trait for driving the Vickrey (second-price) auction
//! contract on the external ledger. The ledger is authoritative for all
//! auction state — the coordinator re-queries it rather than caching —
//! and its transaction ordering is the only serialization point the
//! protocol relies on.

use async_trait::async_trait;

use crate::domain::phase::AuctionTimings;

/// Receipt information for a mutating ledger call.
#[derive(Debug, Clone)]
pub struct TxOutcome {
    /// Transaction hash, hex-encoded.
    pub tx_hash: String,
}

/// Result of submitting a sealed bid.
#[derive(Debug, Clone)]
pub struct SealedBid {
    /// The one-way commitment over `(value, nonce)` that was submitted.
    /// The commitment scheme belongs to the contract, so the ledger
    /// client computes it and hands it back for local bookkeeping.
    pub commitment: [u8; 32],
    /// Transaction hash of the bid submission.
    pub tx_hash: String,
}

/// Trait for the auction contract client.
///
/// Mutating calls are signed transactions; getters are read-only calls.
/// Implementors must not retry internally — the coordinator's cycle
/// policy owns retries.
#[async_trait]
pub trait AuctionLedger: Send + Sync + 'static {
    /// Start a new auction for the given whole-kWh amount, with this
    /// client's account as the seller.
    async fn start_auction(&self, energy_units: u64) -> anyhow::Result<TxOutcome>;

    /// Seal `(value, nonce)` and submit the commitment with the bid
    /// value attached as escrow.
    async fn bid(&self, value_wei: u128, nonce: &str) -> anyhow::Result<SealedBid>;

    /// Disclose a previously sealed `(value, nonce)` pair.
    async fn reveal(&self, value_wei: u128, nonce: &str) -> anyhow::Result<TxOutcome>;

    /// Close the auction once the reveal window has elapsed.
    async fn close_auction(&self) -> anyhow::Result<TxOutcome>;

    /// The three phase-boundary timestamps (zero start = no auction).
    async fn timings(&self) -> anyhow::Result<AuctionTimings>;

    /// Winning bidder account (zero account when no bid was revealed).
    async fn highest_bidder(&self) -> anyhow::Result<String>;

    /// Clearing price: the second-highest revealed bid, in wei.
    async fn second_highest_bid(&self) -> anyhow::Result<u128>;

    /// Auctioned energy amount in whole kWh.
    async fn energy_amount(&self) -> anyhow::Result<u64>;

    /// The auction's seller account.
    async fn seller(&self) -> anyhow::Result<String>;

    /// Current balance of this client's account, in ETH.
    async fn balance_eth(&self) -> anyhow::Result<f64>;

    /// This client's own account, hex-encoded.
    fn account(&self) -> &str;

    /// Whether the ledger connection is healthy.
    async fn is_healthy(&self) -> bool;
}
