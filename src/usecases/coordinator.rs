//! Auction Coordinator - Sealed-Bid Trading Cycle
//!
//! Drives the commit/reveal second-price auction on the external
//! ledger. Each cycle the coordinator derives the auction phase from
//! on-chain timings (never cached, so a restart resumes mid-auction),
//! consumes the freshest dependency bundle from the hub, and acts:
//!
//! - energy deficit during Bidding: submit a sealed bid
//! - energy deficit during Reveal: reveal the pending bid
//! - energy surplus while Idle: start a new auction
//! - phase Closeable: close the auction and classify the outcome
//!
//! The ledger is the source of truth for phase and settlement; only
//! the bid value and nonce live locally, and they are wiped after
//! every close attempt regardless of outcome.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::config::AuctionConfig;
use crate::domain::{
    classify, phase_at, AuctionOutcome, AuctionPhase, BidPricer, BusMessage, CumulativeAccount,
    LocalBidState, MarketSnapshot,
};
use crate::ports::audit::{AuditEventType, AuditSink, AuditStatus, TradeLedgerEntry, TradeSummary};
use crate::ports::bus::{recv_timeout, Mailbox};
use crate::ports::ledger::AuctionLedger;

const WEI_PER_ETH: f64 = 1e18;

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// The auction coordinator.
///
/// Generic over the ledger and audit ports so tests can drive it with
/// mocks. Single-task ownership: all state mutation happens inside the
/// owning task, no locks.
pub struct AuctionCoordinator<L: AuctionLedger, A: AuditSink> {
    ledger: Arc<L>,
    audit: Arc<A>,
    metrics: Arc<MetricsRegistry>,
    pricer: BidPricer,
    config: AuctionConfig,
    account: CumulativeAccount,
    bid_state: LocalBidState,
}

impl<L: AuctionLedger, A: AuditSink> AuctionCoordinator<L, A> {
    pub fn new(
        ledger: Arc<L>,
        audit: Arc<A>,
        metrics: Arc<MetricsRegistry>,
        pricer: BidPricer,
        config: AuctionConfig,
        nonce: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            audit,
            metrics,
            pricer,
            config,
            account: CumulativeAccount::default(),
            bid_state: LocalBidState::new(nonce),
        }
    }

    pub fn account(&self) -> &CumulativeAccount {
        &self.account
    }

    pub fn bid_state(&self) -> &LocalBidState {
        &self.bid_state
    }

    /// Best-effort balance for audit entries; never blocks an operation.
    async fn balance_snapshot(&self) -> Option<f64> {
        self.ledger.balance_eth().await.ok()
    }

    fn audit_entry(&self, event_type: AuditEventType, status: AuditStatus) -> TradeLedgerEntry {
        TradeLedgerEntry::new(self.ledger.account(), event_type, status)
    }

    async fn write_audit(&self, entry: TradeLedgerEntry) {
        if let Err(e) = self.audit.append_entry(&entry).await {
            error!(error = %e, "Failed to write audit entry");
        }
    }

    /// Start an auction offering the given surplus.
    ///
    /// The surplus is rounded to whole kWh; a surplus that rounds to
    /// zero is not worth a transaction and is skipped without touching
    /// the ledger.
    #[instrument(skip(self))]
    pub async fn start_auction(&mut self, surplus_kw: f64) -> bool {
        let energy_kwh = surplus_kw.round();
        if energy_kwh <= 0.0 {
            debug!(surplus_kw, "Surplus rounds to zero, not starting an auction");
            return false;
        }
        let energy_units = energy_kwh as u64;

        // The ledger decides whether an auction is live; a stale phase
        // at the caller must not start a second auction mid-window
        match self.ledger.timings().await {
            Ok(timings) => {
                let phase = phase_at(epoch_secs(), timings);
                if phase != AuctionPhase::Idle {
                    warn!(phase = %phase, "Auction already in progress, not starting another");
                    return false;
                }
            }
            Err(e) => {
                warn!(error = %e, "Cannot confirm the ledger is idle, not starting an auction");
                self.metrics
                    .ledger_failures
                    .with_label_values(&["timings"])
                    .inc();
                let balance = self.balance_snapshot().await;
                self.write_audit(
                    self.audit_entry(AuditEventType::AuctionStart, AuditStatus::Failed)
                        .energy(energy_kwh)
                        .balance(balance),
                )
                .await;
                return false;
            }
        }

        match self.ledger.start_auction(energy_units).await {
            Ok(outcome) => {
                info!(energy_kwh, tx_hash = %outcome.tx_hash, "Auction started");
                self.metrics.auctions_started.inc();
                let balance = self.balance_snapshot().await;
                self.write_audit(
                    self.audit_entry(AuditEventType::AuctionStart, AuditStatus::Success)
                        .energy(energy_kwh)
                        .balance(balance),
                )
                .await;
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to start auction");
                self.metrics
                    .ledger_failures
                    .with_label_values(&["start_auction"])
                    .inc();
                let balance = self.balance_snapshot().await;
                self.write_audit(
                    self.audit_entry(AuditEventType::AuctionStart, AuditStatus::Failed)
                        .energy(energy_kwh)
                        .balance(balance),
                )
                .await;
                false
            }
        }
    }

    /// Price and submit a sealed bid for the current deficit.
    #[instrument(skip(self, snapshot))]
    pub async fn place_bid(&mut self, snapshot: &MarketSnapshot) -> bool {
        let value_wei = self
            .pricer
            .bid_price_wei(snapshot.market_price, snapshot.strategy);
        if value_wei == 0 {
            warn!(
                market_price = snapshot.market_price,
                "Bid priced at zero, skipping"
            );
            return false;
        }

        // Stage before submitting so a crash between tx and response
        // still leaves the value available for reveal
        self.bid_state.stage(value_wei);
        let nonce = self.bid_state.nonce().to_string();

        match self.ledger.bid(value_wei, &nonce).await {
            Ok(sealed) => {
                info!(
                    value_wei,
                    strategy = ?snapshot.strategy,
                    tx_hash = %sealed.tx_hash,
                    "Sealed bid submitted"
                );
                self.bid_state.commit(sealed.commitment);
                self.metrics.bids_placed.inc();
                let balance = self.balance_snapshot().await;
                self.write_audit(
                    self.audit_entry(AuditEventType::Bid, AuditStatus::Success)
                        .price(value_wei as f64 / WEI_PER_ETH)
                        .balance(balance),
                )
                .await;
                true
            }
            Err(e) => {
                warn!(error = %e, "Sealed bid rejected");
                self.metrics
                    .ledger_failures
                    .with_label_values(&["bid"])
                    .inc();
                let balance = self.balance_snapshot().await;
                self.write_audit(
                    self.audit_entry(AuditEventType::Bid, AuditStatus::Failed)
                        .price(value_wei as f64 / WEI_PER_ETH)
                        .balance(balance),
                )
                .await;
                false
            }
        }
    }

    /// Reveal the pending bid, if any.
    ///
    /// A no-op when no bid value is recorded — revealing a zero bid
    /// would only leak the nonce.
    #[instrument(skip(self))]
    pub async fn reveal_pending(&mut self) -> bool {
        if !self.bid_state.has_pending_bid() {
            debug!("No pending bid to reveal");
            return false;
        }
        let value_wei = self.bid_state.bid_value_wei();
        let nonce = self.bid_state.nonce().to_string();

        match self.ledger.reveal(value_wei, &nonce).await {
            Ok(outcome) => {
                info!(value_wei, tx_hash = %outcome.tx_hash, "Bid revealed");
                self.metrics.reveals_submitted.inc();
                self.write_audit(
                    self.audit_entry(AuditEventType::Reveal, AuditStatus::Success)
                        .price(value_wei as f64 / WEI_PER_ETH),
                )
                .await;
                true
            }
            Err(e) => {
                // Bid stays pending; retried while the reveal window lasts
                warn!(error = %e, "Reveal rejected");
                self.metrics
                    .ledger_failures
                    .with_label_values(&["reveal"])
                    .inc();
                let balance = self.balance_snapshot().await;
                self.write_audit(
                    self.audit_entry(AuditEventType::Reveal, AuditStatus::Failed)
                        .price(value_wei as f64 / WEI_PER_ETH)
                        .balance(balance),
                )
                .await;
                false
            }
        }
    }

    /// Close the auction and settle the outcome.
    ///
    /// The local bid state is wiped on every path out of this method —
    /// a failed close must not leave a commitment that could leak into
    /// the next auction.
    #[instrument(skip(self))]
    pub async fn close_auction(&mut self) -> bool {
        let result = self.ledger.close_auction().await;
        self.bid_state.clear();

        let tx = match result {
            Ok(tx) => tx,
            Err(e) => {
                warn!(error = %e, "Failed to close auction");
                self.metrics
                    .ledger_failures
                    .with_label_values(&["close_auction"])
                    .inc();
                self.metrics.closes.with_label_values(&["failed"]).inc();
                let balance = self.balance_snapshot().await;
                self.write_audit(
                    self.audit_entry(AuditEventType::AuctionClose, AuditStatus::Failed)
                        .balance(balance),
                )
                .await;
                return false;
            }
        };

        // Settlement facts come from the contract after the close lands
        let settlement = async {
            let winner = self.ledger.highest_bidder().await?;
            let seller = self.ledger.seller().await?;
            let price_wei = self.ledger.second_highest_bid().await?;
            let energy = self.ledger.energy_amount().await?;
            anyhow::Ok((winner, seller, price_wei, energy))
        }
        .await;

        let (winner, seller, price_wei, energy) = match settlement {
            Ok(facts) => facts,
            Err(e) => {
                // The close landed but settlement facts are unreadable;
                // skip the account mutation rather than guess
                error!(error = %e, tx_hash = %tx.tx_hash, "Close settled but outcome query failed");
                self.metrics
                    .closes
                    .with_label_values(&["unclassified"])
                    .inc();
                let balance = self.balance_snapshot().await;
                self.write_audit(
                    self.audit_entry(AuditEventType::AuctionClose, AuditStatus::Failed)
                        .balance(balance),
                )
                .await;
                return false;
            }
        };

        let outcome = classify(&winner, &seller, self.ledger.account());
        let energy_kwh = energy as f64;
        let price_eth = price_wei as f64 / WEI_PER_ETH;

        info!(
            tx_hash = %tx.tx_hash,
            outcome = ?outcome,
            energy_kwh,
            price_eth,
            "Auction closed"
        );

        let (label, event_type) = match outcome {
            AuctionOutcome::Buy => ("buy", AuditEventType::AuctionBuy),
            AuctionOutcome::Sell => ("sell", AuditEventType::AuctionSell),
            AuctionOutcome::Lost => ("lost", AuditEventType::AuctionLost),
            AuctionOutcome::NoWinner => ("no_winner", AuditEventType::AuctionNoWinner),
            AuctionOutcome::SelfDeal => ("self_deal", AuditEventType::AuctionSelfDeal),
        };
        self.metrics.closes.with_label_values(&[label]).inc();

        match outcome {
            AuctionOutcome::Buy => {
                self.account.record_buy(energy_kwh);
                self.metrics.energy_bought_kwh.set(self.account.total_bought());
            }
            AuctionOutcome::Sell => {
                self.account.record_sell(energy_kwh);
                self.metrics.energy_sold_kwh.set(self.account.total_sold());
            }
            AuctionOutcome::SelfDeal => {
                warn!(account = %winner, "Won own auction; treating as a no-op");
            }
            AuctionOutcome::Lost | AuctionOutcome::NoWinner => {}
        }

        let balance = self.balance_snapshot().await;
        let mut entry = self
            .audit_entry(event_type, AuditStatus::Success)
            .balance(balance);
        match outcome {
            AuctionOutcome::Buy => {
                entry = entry.energy(energy_kwh).price(price_eth).counterparty(seller);
            }
            AuctionOutcome::Sell => {
                entry = entry.energy(energy_kwh).price(price_eth).counterparty(winner);
            }
            // A lost auction still names what was at stake and who took it
            AuctionOutcome::Lost => {
                entry = entry.energy(energy_kwh).counterparty(winner);
            }
            AuctionOutcome::NoWinner | AuctionOutcome::SelfDeal => {}
        }
        self.write_audit(entry).await;

        true
    }

    /// React to a fresh market snapshot given the current phase.
    pub async fn handle_snapshot(&mut self, phase: AuctionPhase, snapshot: &MarketSnapshot) {
        let delta = snapshot.energy_delta();

        if delta < -self.config.epsilon_kw {
            // Deficit: buy energy
            match phase {
                AuctionPhase::Bidding if !self.bid_state.has_pending_bid() => {
                    self.place_bid(snapshot).await;
                }
                AuctionPhase::Reveal => {
                    self.reveal_pending().await;
                }
                _ => {
                    debug!(delta, phase = %phase, "Deficit but no actionable phase");
                }
            }
        } else if delta > self.config.epsilon_kw {
            // Surplus: sell energy, but only when no auction is live
            if phase == AuctionPhase::Idle {
                self.start_auction(delta).await;
            } else {
                debug!(delta, phase = %phase, "Surplus ignored while an auction is live");
            }
        } else {
            debug!(delta, "Energy balanced within tolerance");
        }
    }

    /// Persist a cumulative trade summary.
    async fn write_summary(&self) {
        let summary = TradeSummary {
            timestamp_ms: epoch_secs() * 1000,
            total_bought_kwh: self.account.total_bought(),
            total_sold_kwh: self.account.total_sold(),
        };
        info!(
            total_bought_kwh = summary.total_bought_kwh,
            total_sold_kwh = summary.total_sold_kwh,
            "Trade summary"
        );
        if let Err(e) = self.audit.append_summary(&summary).await {
            error!(error = %e, "Failed to write trade summary");
        }

        if let Some(balance) = self.balance_snapshot().await {
            self.write_audit(
                self.audit_entry(AuditEventType::BalanceSnapshot, AuditStatus::Success)
                    .balance(Some(balance)),
            )
            .await;
        }
    }

    /// Run one trading cycle. Returns the pause to apply before the next.
    async fn cycle(&mut self, mailbox: &mut Mailbox) -> Duration {
        let timings = match self.ledger.timings().await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "Ledger unreachable, backing off");
                self.metrics
                    .ledger_failures
                    .with_label_values(&["timings"])
                    .inc();
                return Duration::from_secs(self.config.disconnect_backoff_seconds);
            }
        };
        let phase = phase_at(epoch_secs(), timings);

        if phase == AuctionPhase::Closeable {
            self.close_auction().await;
            return Duration::from_secs(self.config.post_close_pause_seconds);
        }

        let timeout = Duration::from_secs(self.config.receive_timeout_seconds);
        match recv_timeout(mailbox, timeout).await {
            Some(BusMessage::Bundle(bundle)) => match MarketSnapshot::from_bundle(&bundle) {
                Ok(snapshot) => self.handle_snapshot(phase, &snapshot).await,
                Err(e) => warn!(error = %e, "Discarding malformed bundle"),
            },
            Some(BusMessage::Status { from, .. }) => {
                warn!(role = %from, "Ignoring raw status addressed to the coordinator");
            }
            None => debug!("No bundle this cycle"),
        }

        // Reveal opportunistically even when no bundle arrived; the
        // reveal window is short and the deficit was already priced in
        if phase == AuctionPhase::Reveal && self.bid_state.has_pending_bid() {
            self.reveal_pending().await;
        }

        Duration::from_secs(self.config.cycle_pause_seconds)
    }

    /// Run the coordinator loop until shutdown is signalled.
    pub async fn run(
        mut self,
        mut mailbox: Mailbox,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        info!(
            account = %self.ledger.account(),
            epsilon_kw = self.config.epsilon_kw,
            "Auction coordinator started"
        );

        let summary_interval = Duration::from_secs(self.config.summary_interval_seconds);
        let mut last_summary = Instant::now();

        loop {
            let pause = tokio::select! {
                _ = shutdown.changed() => {
                    info!("Auction coordinator shutting down");
                    self.write_summary().await;
                    return Ok(());
                }
                pause = self.cycle(&mut mailbox) => pause,
            };

            if last_summary.elapsed() >= summary_interval {
                self.write_summary().await;
                last_summary = Instant::now();
            }

            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Auction coordinator shutting down");
                    self.write_summary().await;
                    return Ok(());
                }
                () = tokio::time::sleep(pause) => {}
            }
        }
    }
}
