//! Integration Tests - End-to-end Coordination Component Testing
//!
//! Tests the interaction between usecases, ports, and mock adapters.
//! Uses mockall for trait mocking and tokio::test for async tests.

use std::collections::HashMap;
use std::sync::Arc;

use mockall::mock;
use serde_json::json;

use gridmesh::adapters::bus::MemoryBus;
use gridmesh::adapters::metrics::MetricsRegistry;
use gridmesh::adapters::persistence::JsonlAuditSink;
use gridmesh::config::{AuctionConfig, HubConfig};
use gridmesh::domain::{
    AgentRole, AuctionPhase, AuctionTimings, BidPricer, BusAddress, BusMessage, MarketSnapshot,
    StatusPayload, TradingStrategy,
};
use gridmesh::ports::audit::{
    AuditEventType, AuditSink, AuditStatus, TradeLedgerEntry, TradeSummary,
};
use gridmesh::ports::ledger::{AuctionLedger, SealedBid, TxOutcome};
use gridmesh::usecases::{AuctionCoordinator, DependencyHub};

// ---- Mock Definitions ----

mock! {
    pub Ledger {}

    #[async_trait::async_trait]
    impl AuctionLedger for Ledger {
        async fn start_auction(&self, energy_units: u64) -> anyhow::Result<TxOutcome>;
        async fn bid(&self, value_wei: u128, nonce: &str) -> anyhow::Result<SealedBid>;
        async fn reveal(&self, value_wei: u128, nonce: &str) -> anyhow::Result<TxOutcome>;
        async fn close_auction(&self) -> anyhow::Result<TxOutcome>;
        async fn timings(&self) -> anyhow::Result<AuctionTimings>;
        async fn highest_bidder(&self) -> anyhow::Result<String>;
        async fn second_highest_bid(&self) -> anyhow::Result<u128>;
        async fn energy_amount(&self) -> anyhow::Result<u64>;
        async fn seller(&self) -> anyhow::Result<String>;
        async fn balance_eth(&self) -> anyhow::Result<f64>;
        fn account(&self) -> &str;
        async fn is_healthy(&self) -> bool;
    }
}

mock! {
    pub Audit {}

    #[async_trait::async_trait]
    impl AuditSink for Audit {
        async fn append_entry(&self, entry: &TradeLedgerEntry) -> anyhow::Result<()>;
        async fn append_summary(&self, summary: &TradeSummary) -> anyhow::Result<()>;
        async fn is_healthy(&self) -> bool;
    }
}

// ---- Helpers ----

const OWN_ACCOUNT: &str = "0x00000000000000000000000000000000000000aa";
const PEER_ACCOUNT: &str = "0x00000000000000000000000000000000000000bb";
const SELLER_ACCOUNT: &str = "0x00000000000000000000000000000000000000cc";
const ZERO: &str = "0x0000000000000000000000000000000000000000";

fn hub_config() -> HubConfig {
    let mut dependencies = HashMap::new();
    dependencies.insert(
        AgentRole::Negotiator,
        vec![
            AgentRole::House,
            AgentRole::Forecaster,
            AgentRole::Curtailment,
            AgentRole::Dashboard,
        ],
    );
    dependencies.insert(AgentRole::Forecaster, vec![AgentRole::House]);
    HubConfig {
        tick_seconds: 5,
        freshness_seconds: 30,
        dependencies,
    }
}

fn auction_config() -> AuctionConfig {
    AuctionConfig {
        epsilon_kw: 0.1,
        receive_timeout_seconds: 1,
        post_close_pause_seconds: 0,
        cycle_pause_seconds: 0,
        disconnect_backoff_seconds: 0,
        summary_interval_seconds: 45,
    }
}

fn permissive_audit() -> MockAudit {
    let mut audit = MockAudit::new();
    audit.expect_append_entry().returning(|_| Ok(()));
    audit.expect_append_summary().returning(|_| Ok(()));
    audit
}

fn coordinator(
    ledger: MockLedger,
    audit: MockAudit,
) -> AuctionCoordinator<MockLedger, MockAudit> {
    AuctionCoordinator::new(
        Arc::new(ledger),
        Arc::new(audit),
        Arc::new(MetricsRegistry::new().unwrap()),
        BidPricer::default(),
        auction_config(),
        "mainhouse_negotiator",
    )
}

fn snapshot(production: f64, demand: f64, market_price: f64) -> MarketSnapshot {
    MarketSnapshot {
        production,
        demand,
        market_price,
        strategy: TradingStrategy::Neutral,
    }
}

fn feed_full_bundle(hub: &mut DependencyHub<MemoryBus>, now: u64) {
    hub.ingest_at(now, AgentRole::House, json!({"current_production": 1.0, "current_demand": 4.0}));
    hub.ingest_at(now, AgentRole::Forecaster, json!({"predicted_demand": 4.2, "predicted_production": 1.1}));
    hub.ingest_at(now, AgentRole::Curtailment, json!({"market_value": 0.5, "curtailment": 0.0, "energy_rate": 1.2}));
    hub.ingest_at(now, AgentRole::Dashboard, json!({"strategy": "aggressive"}));
}

// ---- Hub scenarios ----

#[tokio::test]
async fn hub_withholds_until_dependency_set_is_complete() {
    let bus = Arc::new(MemoryBus::new(8));
    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let mut hub = DependencyHub::new(bus, metrics, hub_config());

    hub.ingest_at(100, AgentRole::House, json!({"current_production": 1.0, "current_demand": 4.0}));
    hub.ingest_at(100, AgentRole::Forecaster, json!({"predicted_demand": 4.2, "predicted_production": 1.1}));
    hub.ingest_at(100, AgentRole::Curtailment, json!({"market_value": 0.5, "curtailment": 0.0, "energy_rate": 1.2}));

    // Negotiator still misses the dashboard; forecaster is ready
    let ready = hub.resolve_at(101);
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].0, AgentRole::Forecaster);

    hub.ingest_at(102, AgentRole::Dashboard, json!({"strategy": "aggressive"}));
    let ready = hub.resolve_at(103);
    assert_eq!(ready.len(), 2);

    let negotiator_bundle = ready
        .iter()
        .find(|(consumer, _)| *consumer == AgentRole::Negotiator)
        .map(|(_, bundle)| bundle)
        .unwrap();
    assert_eq!(negotiator_bundle.len(), 4);
}

#[tokio::test]
async fn hub_defers_on_stale_dependency_and_recovers_on_refresh() {
    let bus = Arc::new(MemoryBus::new(8));
    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let mut hub = DependencyHub::new(bus, metrics, hub_config());

    feed_full_bundle(&mut hub, 100);
    hub.ingest_at(140, AgentRole::Forecaster, json!({"predicted_demand": 4.2, "predicted_production": 1.1}));
    hub.ingest_at(140, AgentRole::Curtailment, json!({"market_value": 0.5, "curtailment": 0.0, "energy_rate": 1.2}));
    hub.ingest_at(140, AgentRole::Dashboard, json!({"strategy": "aggressive"}));

    // House is 41s old at t=141, past the 30s freshness window
    assert!(hub.resolve_at(141).is_empty());

    hub.ingest_at(142, AgentRole::House, json!({"current_production": 1.0, "current_demand": 4.0}));
    assert_eq!(hub.resolve_at(143).len(), 2);
}

#[tokio::test]
async fn hub_forwards_malformed_payloads_as_raw() {
    let bus = Arc::new(MemoryBus::new(8));
    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let mut hub = DependencyHub::new(bus, metrics, hub_config());

    feed_full_bundle(&mut hub, 100);
    hub.ingest_at(101, AgentRole::House, json!({"watts": "not-a-meter-reading"}));

    let ready = hub.resolve_at(102);
    let negotiator_bundle = ready
        .iter()
        .find(|(consumer, _)| *consumer == AgentRole::Negotiator)
        .map(|(_, bundle)| bundle)
        .unwrap();
    assert!(matches!(
        negotiator_bundle.get(AgentRole::House),
        Some(StatusPayload::Raw(_))
    ));

    // A raw house payload makes the snapshot unusable downstream
    assert!(MarketSnapshot::from_bundle(negotiator_bundle).is_err());
}

#[tokio::test]
async fn hub_end_to_end_dispatch_over_bus() {
    let mut bus = MemoryBus::new(8);
    let hub_mailbox = bus.register(BusAddress::Hub);
    let mut negotiator_mailbox = bus.register(BusAddress::Role(AgentRole::Negotiator));
    let mut forecaster_mailbox = bus.register(BusAddress::Role(AgentRole::Forecaster));
    let bus = Arc::new(bus);

    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let hub = DependencyHub::new(Arc::clone(&bus), metrics, hub_config());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let hub_task = tokio::spawn(hub.run(hub_mailbox, shutdown_rx));

    use gridmesh::ports::bus::MessageBus;
    for (role, body) in [
        (AgentRole::House, json!({"current_production": 1.0, "current_demand": 4.0})),
        (AgentRole::Forecaster, json!({"predicted_demand": 4.2, "predicted_production": 1.1})),
        (AgentRole::Curtailment, json!({"market_value": 0.5, "curtailment": 0.0, "energy_rate": 1.2})),
        (AgentRole::Dashboard, json!({"strategy": "neutral"})),
    ] {
        bus.send(BusAddress::Hub, BusMessage::Status { from: role, body })
            .await
            .unwrap();
    }

    let negotiator_bundle = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        negotiator_mailbox.recv(),
    )
    .await
    .expect("negotiator bundle within one tick")
    .unwrap();
    match negotiator_bundle {
        BusMessage::Bundle(bundle) => assert_eq!(bundle.len(), 4),
        other => panic!("expected bundle, got {other:?}"),
    }

    let forecaster_bundle = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        forecaster_mailbox.recv(),
    )
    .await
    .expect("forecaster bundle within one tick")
    .unwrap();
    assert!(matches!(forecaster_bundle, BusMessage::Bundle(_)));

    shutdown_tx.send(true).unwrap();
    hub_task.await.unwrap().unwrap();
}

// ---- Coordinator scenarios ----

#[tokio::test]
async fn deficit_during_bidding_places_a_sealed_bid() {
    let mut ledger = MockLedger::new();
    ledger.expect_account().return_const(OWN_ACCOUNT.to_string());
    ledger.expect_balance_eth().returning(|| Ok(2.0));
    ledger
        .expect_bid()
        .withf(|value_wei, nonce| *value_wei == 500_000_000_000_000_000 && nonce == "mainhouse_negotiator")
        .times(1)
        .returning(|_, _| {
            Ok(SealedBid {
                commitment: [9u8; 32],
                tx_hash: "0x01".into(),
            })
        });

    let mut coordinator = coordinator(ledger, permissive_audit());

    // demand 4.0 vs production 1.0: deficit; neutral factor keeps price
    coordinator
        .handle_snapshot(AuctionPhase::Bidding, &snapshot(1.0, 4.0, 0.5))
        .await;

    assert!(coordinator.bid_state().has_pending_bid());
    assert_eq!(coordinator.bid_state().commitment(), Some([9u8; 32]));
}

#[tokio::test]
async fn pending_bid_is_not_resubmitted() {
    let mut ledger = MockLedger::new();
    ledger.expect_account().return_const(OWN_ACCOUNT.to_string());
    ledger.expect_balance_eth().returning(|| Ok(2.0));
    ledger.expect_bid().times(1).returning(|_, _| {
        Ok(SealedBid {
            commitment: [9u8; 32],
            tx_hash: "0x01".into(),
        })
    });

    let mut coordinator = coordinator(ledger, permissive_audit());
    coordinator
        .handle_snapshot(AuctionPhase::Bidding, &snapshot(1.0, 4.0, 0.5))
        .await;
    // Second bundle in the same bidding window: the mock's times(1)
    // fails the test if another bid goes out
    coordinator
        .handle_snapshot(AuctionPhase::Bidding, &snapshot(1.0, 4.0, 0.5))
        .await;
}

#[tokio::test]
async fn surplus_starts_an_auction_only_when_idle() {
    let mut ledger = MockLedger::new();
    ledger.expect_account().return_const(OWN_ACCOUNT.to_string());
    ledger.expect_balance_eth().returning(|| Ok(2.0));
    ledger.expect_timings().returning(|| {
        Ok(AuctionTimings {
            bidding_start: 0,
            bidding_end: 0,
            reveal_end: 0,
        })
    });
    ledger
        .expect_start_auction()
        .withf(|energy| *energy == 3)
        .times(1)
        .returning(|_| Ok(TxOutcome { tx_hash: "0x02".into() }));

    let mut coordinator = coordinator(ledger, permissive_audit());

    // Surplus while an auction is live: no start_auction call
    coordinator
        .handle_snapshot(AuctionPhase::Bidding, &snapshot(4.0, 1.0, 0.5))
        .await;
    coordinator
        .handle_snapshot(AuctionPhase::Reveal, &snapshot(4.0, 1.0, 0.5))
        .await;

    // Idle: the 3 kW surplus is offered
    coordinator
        .handle_snapshot(AuctionPhase::Idle, &snapshot(4.0, 1.0, 0.5))
        .await;
}

#[tokio::test]
async fn surplus_below_one_kwh_is_not_auctioned() {
    let mut ledger = MockLedger::new();
    ledger.expect_account().return_const(OWN_ACCOUNT.to_string());
    // No start_auction expectation: any ledger call fails the test

    let mut coordinator = coordinator(ledger, permissive_audit());
    assert!(!coordinator.start_auction(0.4).await);
}

#[tokio::test]
async fn start_auction_refuses_while_an_auction_is_live() {
    let mut ledger = MockLedger::new();
    ledger.expect_account().return_const(OWN_ACCOUNT.to_string());
    ledger.expect_timings().returning(|| {
        Ok(AuctionTimings {
            bidding_start: 1,
            bidding_end: u64::MAX,
            reveal_end: u64::MAX,
        })
    });
    // No start_auction expectation: submitting a transaction fails the test

    let mut coordinator = coordinator(ledger, permissive_audit());
    assert!(!coordinator.start_auction(5.0).await);
}

#[tokio::test]
async fn failed_bid_is_audited_with_a_balance_snapshot() {
    let mut ledger = MockLedger::new();
    ledger.expect_account().return_const(OWN_ACCOUNT.to_string());
    ledger.expect_balance_eth().returning(|| Ok(1.25));
    ledger
        .expect_bid()
        .returning(|_, _| Err(anyhow::anyhow!("execution reverted")));

    let mut audit = MockAudit::new();
    audit
        .expect_append_entry()
        .withf(|entry| {
            entry.event_type == AuditEventType::Bid
                && entry.status == AuditStatus::Failed
                && entry.balance_eth == Some(1.25)
        })
        .times(1)
        .returning(|_| Ok(()));

    let mut coordinator = coordinator(ledger, audit);
    assert!(!coordinator.place_bid(&snapshot(1.0, 4.0, 0.5)).await);
}

#[tokio::test]
async fn reveal_is_a_noop_without_a_pending_bid() {
    let mut ledger = MockLedger::new();
    ledger.expect_account().return_const(OWN_ACCOUNT.to_string());
    // No reveal expectation: a reveal call fails the test

    let mut coordinator = coordinator(ledger, permissive_audit());
    assert!(!coordinator.reveal_pending().await);
}

#[tokio::test]
async fn winning_close_records_a_buy() {
    let mut ledger = MockLedger::new();
    ledger.expect_account().return_const(OWN_ACCOUNT.to_string());
    ledger.expect_balance_eth().returning(|| Ok(2.0));
    ledger
        .expect_close_auction()
        .times(1)
        .returning(|| Ok(TxOutcome { tx_hash: "0x03".into() }));
    ledger
        .expect_highest_bidder()
        .returning(|| Ok(OWN_ACCOUNT.to_string()));
    ledger
        .expect_seller()
        .returning(|| Ok(PEER_ACCOUNT.to_string()));
    ledger
        .expect_second_highest_bid()
        .returning(|| Ok(400_000_000_000_000_000));
    ledger.expect_energy_amount().returning(|| Ok(3));

    let mut audit = MockAudit::new();
    audit
        .expect_append_entry()
        .withf(|entry| {
            entry.event_type == AuditEventType::AuctionBuy
                && entry.status == AuditStatus::Success
                && entry.energy_kwh == Some(3.0)
                && entry.counterparty.as_deref() == Some(PEER_ACCOUNT)
        })
        .times(1)
        .returning(|_| Ok(()));

    let mut coordinator = coordinator(ledger, audit);
    assert!(coordinator.close_auction().await);
    assert_eq!(coordinator.account().total_bought(), 3.0);
    assert_eq!(coordinator.account().total_sold(), 0.0);
}

#[tokio::test]
async fn no_winner_close_mutates_nothing() {
    let mut ledger = MockLedger::new();
    ledger.expect_account().return_const(OWN_ACCOUNT.to_string());
    ledger.expect_balance_eth().returning(|| Ok(2.0));
    ledger
        .expect_close_auction()
        .returning(|| Ok(TxOutcome { tx_hash: "0x04".into() }));
    ledger.expect_highest_bidder().returning(|| Ok(ZERO.to_string()));
    ledger
        .expect_seller()
        .returning(|| Ok(PEER_ACCOUNT.to_string()));
    ledger.expect_second_highest_bid().returning(|| Ok(0));
    ledger.expect_energy_amount().returning(|| Ok(3));

    let mut audit = MockAudit::new();
    audit
        .expect_append_entry()
        .withf(|entry| {
            entry.event_type == AuditEventType::AuctionNoWinner && entry.energy_kwh.is_none()
        })
        .times(1)
        .returning(|_| Ok(()));

    let mut coordinator = coordinator(ledger, audit);
    assert!(coordinator.close_auction().await);
    assert_eq!(coordinator.account().total_bought(), 0.0);
    assert_eq!(coordinator.account().total_sold(), 0.0);
}

#[tokio::test]
async fn failed_close_still_clears_the_local_bid() {
    let mut ledger = MockLedger::new();
    ledger.expect_account().return_const(OWN_ACCOUNT.to_string());
    ledger.expect_balance_eth().returning(|| Ok(2.0));
    ledger.expect_bid().returning(|_, _| {
        Ok(SealedBid {
            commitment: [7u8; 32],
            tx_hash: "0x05".into(),
        })
    });
    ledger
        .expect_close_auction()
        .returning(|| Err(anyhow::anyhow!("execution reverted")));

    let mut coordinator = coordinator(ledger, permissive_audit());
    coordinator
        .handle_snapshot(AuctionPhase::Bidding, &snapshot(1.0, 4.0, 0.5))
        .await;
    assert!(coordinator.bid_state().has_pending_bid());

    assert!(!coordinator.close_auction().await);
    assert!(!coordinator.bid_state().has_pending_bid());
    assert_eq!(coordinator.bid_state().commitment(), None);
}

#[tokio::test]
async fn failed_close_is_audited_with_a_balance_snapshot() {
    let mut ledger = MockLedger::new();
    ledger.expect_account().return_const(OWN_ACCOUNT.to_string());
    ledger.expect_balance_eth().returning(|| Ok(1.5));
    ledger
        .expect_close_auction()
        .returning(|| Err(anyhow::anyhow!("execution reverted")));

    let mut audit = MockAudit::new();
    audit
        .expect_append_entry()
        .withf(|entry| {
            entry.event_type == AuditEventType::AuctionClose
                && entry.status == AuditStatus::Failed
                && entry.balance_eth == Some(1.5)
        })
        .times(1)
        .returning(|_| Ok(()));

    let mut coordinator = coordinator(ledger, audit);
    assert!(!coordinator.close_auction().await);
}

#[tokio::test]
async fn lost_close_records_the_stake_and_the_winner() {
    let mut ledger = MockLedger::new();
    ledger.expect_account().return_const(OWN_ACCOUNT.to_string());
    ledger.expect_balance_eth().returning(|| Ok(2.0));
    ledger
        .expect_close_auction()
        .returning(|| Ok(TxOutcome { tx_hash: "0x07".into() }));
    ledger
        .expect_highest_bidder()
        .returning(|| Ok(PEER_ACCOUNT.to_string()));
    ledger
        .expect_seller()
        .returning(|| Ok(SELLER_ACCOUNT.to_string()));
    ledger
        .expect_second_highest_bid()
        .returning(|| Ok(300_000_000_000_000_000));
    ledger.expect_energy_amount().returning(|| Ok(4));

    let mut audit = MockAudit::new();
    audit
        .expect_append_entry()
        .withf(|entry| {
            entry.event_type == AuditEventType::AuctionLost
                && entry.energy_kwh == Some(4.0)
                && entry.counterparty.as_deref() == Some(PEER_ACCOUNT)
                && entry.price_eth.is_none()
        })
        .times(1)
        .returning(|_| Ok(()));

    let mut coordinator = coordinator(ledger, audit);
    assert!(coordinator.close_auction().await);
    assert_eq!(coordinator.account().total_bought(), 0.0);
    assert_eq!(coordinator.account().total_sold(), 0.0);
}

#[tokio::test]
async fn winning_own_auction_is_treated_as_invalid() {
    let mut ledger = MockLedger::new();
    ledger.expect_account().return_const(OWN_ACCOUNT.to_string());
    ledger.expect_balance_eth().returning(|| Ok(2.0));
    ledger
        .expect_close_auction()
        .returning(|| Ok(TxOutcome { tx_hash: "0x06".into() }));
    ledger
        .expect_highest_bidder()
        .returning(|| Ok(OWN_ACCOUNT.to_string()));
    ledger
        .expect_seller()
        .returning(|| Ok(OWN_ACCOUNT.to_string()));
    ledger
        .expect_second_highest_bid()
        .returning(|| Ok(100_000_000_000_000_000));
    ledger.expect_energy_amount().returning(|| Ok(2));

    let mut audit = MockAudit::new();
    audit
        .expect_append_entry()
        .withf(|entry| entry.event_type == AuditEventType::AuctionSelfDeal)
        .times(1)
        .returning(|_| Ok(()));

    let mut coordinator = coordinator(ledger, audit);
    assert!(coordinator.close_auction().await);
    assert_eq!(coordinator.account().total_bought(), 0.0);
    assert_eq!(coordinator.account().total_sold(), 0.0);
}

#[tokio::test]
async fn balanced_snapshot_touches_no_ledger_operation() {
    let mut ledger = MockLedger::new();
    ledger.expect_account().return_const(OWN_ACCOUNT.to_string());
    // Any bid/start/reveal call fails the test

    let mut coordinator = coordinator(ledger, permissive_audit());
    coordinator
        .handle_snapshot(AuctionPhase::Bidding, &snapshot(2.0, 2.05, 0.5))
        .await;
}

// ---- Audit sink round trip ----

#[tokio::test]
async fn audit_sink_round_trips_entries_and_summaries() {
    let dir = std::env::temp_dir().join(format!("gridmesh-audit-{}", uuid::Uuid::new_v4()));
    let sink = JsonlAuditSink::new(dir.to_str().unwrap()).await.unwrap();

    let entry = TradeLedgerEntry::new(OWN_ACCOUNT, AuditEventType::AuctionBuy, AuditStatus::Success)
        .energy(3.0)
        .price(0.4)
        .balance(Some(1.75))
        .counterparty(PEER_ACCOUNT);
    sink.append_entry(&entry).await.unwrap();

    let summary = TradeSummary {
        timestamp_ms: 1_000,
        total_bought_kwh: 3.0,
        total_sold_kwh: 0.0,
    };
    sink.append_summary(&summary).await.unwrap();

    let entries = sink.load_all_entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, entry.id);
    assert_eq!(entries[0].counterparty.as_deref(), Some(PEER_ACCOUNT));

    let summaries = sink.load_summaries().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total_bought_kwh, 3.0);

    assert!(sink.is_healthy().await);
    tokio::fs::remove_dir_all(&dir).await.unwrap();
}
