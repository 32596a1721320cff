//! Auction close-outcome classification.
//!
//! After a close transaction the ledger exposes the winner, the seller and
//! the clearing price (second-highest revealed bid). Classification of
//! those read-backs into a local trade outcome is a pure function so it
//! can be tested exhaustively.

use serde::{Deserialize, Serialize};

/// The all-zero account, reported by the ledger when no bid was revealed.
pub const ZERO_ACCOUNT: &str = "0x0000000000000000000000000000000000000000";

/// Outcome of a closed auction from this participant's point of view.
///
/// The variants are mutually exclusive and cover every combination of
/// winner/seller the ledger can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionOutcome {
    /// We won the auction and someone else sold: energy bought.
    Buy,
    /// Someone else won and we were the seller: energy sold.
    Sell,
    /// Someone else won someone else's auction.
    Lost,
    /// No bid was revealed; the winner is the zero account.
    NoWinner,
    /// We are recorded as both winner and seller. Undefined on the
    /// ledger side; treated as invalid and never mutates the account.
    SelfDeal,
}

impl AuctionOutcome {
    /// Whether this outcome mutates the cumulative account.
    pub fn mutates_account(self) -> bool {
        matches!(self, Self::Buy | Self::Sell)
    }
}

/// Classify a close read-back. Account comparison is case-insensitive
/// because ledger clients are inconsistent about hex checksum casing.
pub fn classify(winner: &str, seller: &str, own_account: &str) -> AuctionOutcome {
    let eq = |a: &str, b: &str| a.eq_ignore_ascii_case(b);

    if eq(winner, ZERO_ACCOUNT) {
        AuctionOutcome::NoWinner
    } else if eq(winner, own_account) {
        if eq(seller, own_account) {
            AuctionOutcome::SelfDeal
        } else {
            AuctionOutcome::Buy
        }
    } else if eq(seller, own_account) {
        AuctionOutcome::Sell
    } else {
        AuctionOutcome::Lost
    }
}
