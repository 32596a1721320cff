//! Bid pricing policy.
//!
//! Maps the current market price and the dashboard's strategy tag to a
//! concrete bid price: bid = market price × strategy factor. Factors are
//! configurable; the defaults are aggressive 1.10, neutral 1.00,
//! conservative 0.90, which keeps the policy monotone in the market price
//! and trivially auditable.
//!
//! Exposes Decimal arithmetic internally with an f64/wei boundary, so the
//! wei conversion never goes through binary floating point.

use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

use crate::domain::message::TradingStrategy;

/// Wei per ETH as a Decimal constant.
fn wei_per_eth() -> Decimal {
    dec!(1_000_000_000_000_000_000)
}

/// Strategy-factor bid pricer.
#[derive(Debug, Clone)]
pub struct BidPricer {
    aggressive: Decimal,
    neutral: Decimal,
    conservative: Decimal,
}

impl BidPricer {
    /// Create a pricer with the given strategy factors.
    ///
    /// # Panics
    /// Panics if any factor is not positive.
    pub fn new(aggressive: f64, neutral: f64, conservative: f64) -> Self {
        let to_dec = |v: f64, name: &str| {
            let d = Decimal::from_f64(v).unwrap_or(Decimal::ZERO);
            assert!(d > Decimal::ZERO, "{name} pricing factor must be positive");
            d
        };
        Self {
            aggressive: to_dec(aggressive, "aggressive"),
            neutral: to_dec(neutral, "neutral"),
            conservative: to_dec(conservative, "conservative"),
        }
    }

    fn factor(&self, strategy: TradingStrategy) -> Decimal {
        match strategy {
            TradingStrategy::Aggressive => self.aggressive,
            TradingStrategy::Neutral => self.neutral,
            TradingStrategy::Conservative => self.conservative,
        }
    }

    /// Bid price in ETH for the given market price and strategy.
    ///
    /// Non-finite or negative market prices clamp to zero.
    pub fn bid_price_eth(&self, market_price_eth: f64, strategy: TradingStrategy) -> f64 {
        let market = Decimal::from_f64(market_price_eth)
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO);
        (market * self.factor(strategy)).to_f64().unwrap_or(0.0)
    }

    /// Bid price in wei, truncated to a whole wei.
    pub fn bid_price_wei(&self, market_price_eth: f64, strategy: TradingStrategy) -> u128 {
        let market = Decimal::from_f64(market_price_eth)
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO);
        let wei = market * self.factor(strategy) * wei_per_eth();
        wei.trunc().to_u128().unwrap_or(0)
    }
}

impl Default for BidPricer {
    fn default() -> Self {
        Self {
            aggressive: dec!(1.10),
            neutral: dec!(1.00),
            conservative: dec!(0.90),
        }
    }
}
