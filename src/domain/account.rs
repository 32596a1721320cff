//! Local trading state: cumulative account and bid bookkeeping.

use serde::{Deserialize, Serialize};

/// Monotonically non-decreasing cumulative trade totals.
///
/// Mutated only by a successful close classified as Buy or Sell; the
/// append-only audit log, not this struct, is the source of truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CumulativeAccount {
    total_energy_bought: f64,
    total_energy_sold: f64,
}

impl CumulativeAccount {
    pub fn record_buy(&mut self, energy_kwh: f64) {
        self.total_energy_bought += energy_kwh.max(0.0);
    }

    pub fn record_sell(&mut self, energy_kwh: f64) {
        self.total_energy_sold += energy_kwh.max(0.0);
    }

    pub fn total_bought(&self) -> f64 {
        self.total_energy_bought
    }

    pub fn total_sold(&self) -> f64 {
        self.total_energy_sold
    }
}

/// The coordinator's private view of its own sealed bid.
///
/// Single writer (the owning coordinator); reset to empty after every
/// close attempt so a stale commitment can never leak into the next
/// auction. The nonce is fixed per coordinator instance and survives
/// resets — it identifies the bidder, not the bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalBidState {
    commitment: Option<[u8; 32]>,
    bid_value_wei: u128,
    nonce: String,
}

impl LocalBidState {
    pub fn new(nonce: impl Into<String>) -> Self {
        Self {
            commitment: None,
            bid_value_wei: 0,
            nonce: nonce.into(),
        }
    }

    /// Record the value of a bid about to be submitted. Overwrites any
    /// previous value; the commitment is attached once the ledger call
    /// succeeds.
    pub fn stage(&mut self, bid_value_wei: u128) {
        self.bid_value_wei = bid_value_wei;
        self.commitment = None;
    }

    /// Attach the sealed commitment returned by the ledger client.
    pub fn commit(&mut self, commitment: [u8; 32]) {
        self.commitment = Some(commitment);
    }

    /// Clear everything except the nonce.
    pub fn clear(&mut self) {
        self.commitment = None;
        self.bid_value_wei = 0;
    }

    /// Whether a bid value is recorded and worth revealing.
    pub fn has_pending_bid(&self) -> bool {
        self.bid_value_wei > 0
    }

    pub fn bid_value_wei(&self) -> u128 {
        self.bid_value_wei
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn commitment(&self) -> Option<[u8; 32]> {
        self.commitment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_totals_accumulate() {
        let mut account = CumulativeAccount::default();
        account.record_buy(5.0);
        account.record_buy(2.5);
        account.record_sell(4.0);
        assert_eq!(account.total_bought(), 7.5);
        assert_eq!(account.total_sold(), 4.0);
    }

    #[test]
    fn test_negative_energy_never_decreases_totals() {
        let mut account = CumulativeAccount::default();
        account.record_buy(3.0);
        account.record_buy(-10.0);
        account.record_sell(-1.0);
        assert_eq!(account.total_bought(), 3.0);
        assert_eq!(account.total_sold(), 0.0);
    }

    #[test]
    fn test_bid_state_clear_keeps_nonce() {
        let mut state = LocalBidState::new("mainhouse_negotiator");
        state.stage(1_000);
        state.commit([7u8; 32]);
        assert!(state.has_pending_bid());

        state.clear();
        assert!(!state.has_pending_bid());
        assert_eq!(state.bid_value_wei(), 0);
        assert_eq!(state.commitment(), None);
        assert_eq!(state.nonce(), "mainhouse_negotiator");
    }

    #[test]
    fn test_stage_overwrites_previous_bid() {
        let mut state = LocalBidState::new("n");
        state.stage(100);
        state.commit([1u8; 32]);
        state.stage(200);
        assert_eq!(state.bid_value_wei(), 200);
        assert_eq!(state.commitment(), None);
    }
}
