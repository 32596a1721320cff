//! Property-Based Tests — Domain Layer Invariants
//!
//! Uses `proptest` to verify that domain components maintain
//! their invariants across random inputs.

use proptest::prelude::*;

use gridmesh::domain::{
    classify, phase_at, AuctionOutcome, AuctionPhase, AuctionTimings, BidPricer, TradingStrategy,
    ZERO_ACCOUNT,
};

fn ordered_timings() -> impl Strategy<Value = AuctionTimings> {
    (1u64..1_000_000, 1u64..10_000, 1u64..10_000).prop_map(|(start, bid_len, reveal_len)| {
        AuctionTimings {
            bidding_start: start,
            bidding_end: start + bid_len,
            reveal_end: start + bid_len + reveal_len,
        }
    })
}

// ── Phase Function Properties ───────────────────────────────

proptest! {
    /// The phase function is pure: same inputs, same phase.
    #[test]
    fn phase_is_deterministic(now in 0u64..2_000_000, timings in ordered_timings()) {
        prop_assert_eq!(phase_at(now, timings), phase_at(now, timings));
    }

    /// With ordered timings, the phase never moves backwards as the
    /// clock advances.
    #[test]
    fn phase_never_regresses(
        now in 0u64..2_000_000,
        step in 0u64..100_000,
        timings in ordered_timings(),
    ) {
        let before = phase_at(now, timings);
        let after = phase_at(now + step, timings);
        prop_assert!(
            after >= before,
            "phase regressed from {before:?} to {after:?}"
        );
    }

    /// Zeroed timings always read as Idle, whatever the clock says.
    #[test]
    fn unset_timings_are_always_idle(now in 0u64..u64::MAX) {
        let timings = AuctionTimings { bidding_start: 0, bidding_end: 0, reveal_end: 0 };
        prop_assert_eq!(phase_at(now, timings), AuctionPhase::Idle);
    }

    /// Inside the bidding window the phase is Bidding, and past the
    /// reveal deadline it is Closeable.
    #[test]
    fn window_boundaries_hold(timings in ordered_timings()) {
        prop_assert_eq!(phase_at(timings.bidding_start, timings), AuctionPhase::Bidding);
        prop_assert_eq!(phase_at(timings.bidding_end, timings), AuctionPhase::Reveal);
        prop_assert_eq!(phase_at(timings.reveal_end + 1, timings), AuctionPhase::Closeable);
    }
}

// ── Outcome Classification Properties ───────────────────────

fn hex_account() -> impl Strategy<Value = String> {
    "[0-9a-f]{40}".prop_map(|hex| format!("0x{hex}"))
}

proptest! {
    /// The zero winner always classifies as NoWinner regardless of
    /// seller or own account.
    #[test]
    fn zero_winner_is_no_winner(seller in hex_account(), own in hex_account()) {
        prop_assert_eq!(classify(ZERO_ACCOUNT, &seller, &own), AuctionOutcome::NoWinner);
    }

    /// Classification is case-insensitive over the winner address.
    #[test]
    fn classification_ignores_hex_case(winner in hex_account(), seller in hex_account()) {
        let own = winner.to_uppercase();
        prop_assert_eq!(classify(&winner, &seller, &own), classify(&winner, &seller, &winner));
    }

    /// Buy and Sell are mutually exclusive: no (winner, seller, own)
    /// triple classifies as both sides of the same trade.
    #[test]
    fn buy_and_sell_are_exclusive(winner in hex_account(), seller in hex_account(), own in hex_account()) {
        let outcome = classify(&winner, &seller, &own);
        if outcome == AuctionOutcome::Buy {
            prop_assert!(winner.eq_ignore_ascii_case(&own) && !seller.eq_ignore_ascii_case(&own));
        }
        if outcome == AuctionOutcome::Sell {
            prop_assert!(seller.eq_ignore_ascii_case(&own) && !winner.eq_ignore_ascii_case(&own));
        }
    }

    /// Only Buy and Sell may touch the cumulative account.
    #[test]
    fn only_trades_mutate_account(winner in hex_account(), seller in hex_account(), own in hex_account()) {
        let outcome = classify(&winner, &seller, &own);
        if outcome.mutates_account() {
            prop_assert!(matches!(outcome, AuctionOutcome::Buy | AuctionOutcome::Sell));
        }
    }
}

// ── Bid Pricing Properties ──────────────────────────────────

proptest! {
    /// Bid price scales monotonically with the market price for any
    /// fixed strategy.
    #[test]
    fn bid_price_monotone_in_market_price(
        price in 0.0f64..100.0,
        bump in 0.0f64..10.0,
    ) {
        let pricer = BidPricer::default();
        let low = pricer.bid_price_wei(price, TradingStrategy::Neutral);
        let high = pricer.bid_price_wei(price + bump, TradingStrategy::Neutral);
        prop_assert!(high >= low);
    }

    /// Strategies order the bid: aggressive >= neutral >= conservative.
    #[test]
    fn strategies_order_the_bid(price in 0.001f64..100.0) {
        let pricer = BidPricer::default();
        let aggressive = pricer.bid_price_wei(price, TradingStrategy::Aggressive);
        let neutral = pricer.bid_price_wei(price, TradingStrategy::Neutral);
        let conservative = pricer.bid_price_wei(price, TradingStrategy::Conservative);
        prop_assert!(aggressive >= neutral);
        prop_assert!(neutral >= conservative);
    }

    /// Garbage market prices never price a positive bid.
    #[test]
    fn non_positive_market_price_yields_zero(price in -100.0f64..=0.0) {
        let pricer = BidPricer::default();
        prop_assert_eq!(pricer.bid_price_wei(price, TradingStrategy::Aggressive), 0);
    }
}
