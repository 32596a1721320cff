//! Auction phase derivation.
//!
//! The coordinator never stores a phase transition. The phase is a pure
//! function of wall-clock time and the three boundary timestamps that live
//! on the ledger, recomputed every cycle. That makes the coordinator
//! crash-recoverable: after a restart it re-derives the correct phase from
//! the ledger instead of from local memory.

use serde::{Deserialize, Serialize};

/// Boundary timestamps of the current auction, in seconds since the Unix
/// epoch, read fresh from the ledger every cycle.
///
/// `bidding_start == 0` means no auction has been configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionTimings {
    pub bidding_start: u64,
    pub bidding_end: u64,
    pub reveal_end: u64,
}

/// The stage the auction protocol is in at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AuctionPhase {
    /// No auction configured (`bidding_start == 0`).
    Idle,
    /// Auction scheduled, bidding window not yet open.
    PreBidding,
    /// Sealed bids are accepted.
    Bidding,
    /// Bidders disclose their sealed values.
    Reveal,
    /// Reveal window elapsed; the auction can be closed.
    Closeable,
}

impl std::fmt::Display for AuctionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::PreBidding => "pre_bidding",
            Self::Bidding => "bidding",
            Self::Reveal => "reveal",
            Self::Closeable => "closeable",
        };
        f.write_str(name)
    }
}

/// Derive the auction phase from the current time and ledger timestamps.
///
/// Pure and idempotent: identical inputs always yield the identical phase,
/// independent of call history. The bidding window is half-open
/// (`now < bidding_end`), the reveal window closed (`now <= reveal_end`).
pub fn phase_at(now: u64, timings: AuctionTimings) -> AuctionPhase {
    if timings.bidding_start == 0 {
        AuctionPhase::Idle
    } else if now < timings.bidding_start {
        AuctionPhase::PreBidding
    } else if now < timings.bidding_end {
        AuctionPhase::Bidding
    } else if now <= timings.reveal_end {
        AuctionPhase::Reveal
    } else {
        AuctionPhase::Closeable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timings(t0: u64) -> AuctionTimings {
        AuctionTimings {
            bidding_start: t0 + 5,
            bidding_end: t0 + 65,
            reveal_end: t0 + 125,
        }
    }

    #[test]
    fn test_zero_start_means_idle() {
        let t = AuctionTimings::default();
        assert_eq!(phase_at(0, t), AuctionPhase::Idle);
        assert_eq!(phase_at(u64::MAX, t), AuctionPhase::Idle);
    }

    #[test]
    fn test_phase_progression_through_windows() {
        let t0 = 1_700_000_000;
        let t = timings(t0);
        assert_eq!(phase_at(t0 + 3, t), AuctionPhase::PreBidding);
        assert_eq!(phase_at(t0 + 40, t), AuctionPhase::Bidding);
        assert_eq!(phase_at(t0 + 100, t), AuctionPhase::Reveal);
        assert_eq!(phase_at(t0 + 130, t), AuctionPhase::Closeable);
    }

    #[test]
    fn test_window_boundaries() {
        let t0 = 1_700_000_000;
        let t = timings(t0);
        // Bidding opens exactly at bidding_start.
        assert_eq!(phase_at(t0 + 5, t), AuctionPhase::Bidding);
        // Bidding window is half-open: bidding_end belongs to reveal.
        assert_eq!(phase_at(t0 + 65, t), AuctionPhase::Reveal);
        // Reveal window is closed: reveal_end itself is still reveal.
        assert_eq!(phase_at(t0 + 125, t), AuctionPhase::Reveal);
        assert_eq!(phase_at(t0 + 126, t), AuctionPhase::Closeable);
    }
}
