//! Prometheus Metrics Registry - Coordination Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards.
//! Covers hub ingest/dispatch activity, auction protocol calls by
//! outcome, ledger failures, and the cumulative trade totals.

use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Centralized Prometheus metrics for the coordination core.
///
/// All metrics follow the naming convention `gridmesh_*` and use role,
/// operation or outcome labels for filtering.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Statuses ingested by the hub, per producer role.
    pub statuses_ingested: IntCounterVec,
    /// Bundles dispatched by the hub, per consumer role.
    pub bundles_dispatched: IntCounterVec,
    /// Evaluations deferred because of a missing or stale dependency.
    pub dispatch_deferred: IntCounterVec,
    /// Bus send failures, per destination.
    pub bus_send_failures: IntCounterVec,
    /// Auctions started by this node.
    pub auctions_started: IntCounter,
    /// Sealed bids submitted.
    pub bids_placed: IntCounter,
    /// Reveals submitted.
    pub reveals_submitted: IntCounter,
    /// Close attempts, per classified outcome (or "failed").
    pub closes: IntCounterVec,
    /// Ledger call failures, per operation.
    pub ledger_failures: IntCounterVec,
    /// Cumulative energy bought gauge (kWh).
    pub energy_bought_kwh: Gauge,
    /// Cumulative energy sold gauge (kWh).
    pub energy_sold_kwh: Gauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let statuses_ingested = IntCounterVec::new(
            Opts::new("gridmesh_statuses_ingested_total", "Statuses ingested by the hub"),
            &["role"],
        )?;

        let bundles_dispatched = IntCounterVec::new(
            Opts::new(
                "gridmesh_bundles_dispatched_total",
                "Dependency bundles dispatched by the hub",
            ),
            &["consumer"],
        )?;

        let dispatch_deferred = IntCounterVec::new(
            Opts::new(
                "gridmesh_dispatch_deferred_total",
                "Evaluations deferred for missing or stale dependencies",
            ),
            &["consumer"],
        )?;

        let bus_send_failures = IntCounterVec::new(
            Opts::new("gridmesh_bus_send_failures_total", "Bus send failures"),
            &["destination"],
        )?;

        let auctions_started = IntCounter::new(
            "gridmesh_auctions_started_total",
            "Auctions started by this node",
        )?;

        let bids_placed =
            IntCounter::new("gridmesh_bids_placed_total", "Sealed bids submitted")?;

        let reveals_submitted =
            IntCounter::new("gridmesh_reveals_submitted_total", "Reveals submitted")?;

        let closes = IntCounterVec::new(
            Opts::new("gridmesh_closes_total", "Close attempts by outcome"),
            &["outcome"],
        )?;

        let ledger_failures = IntCounterVec::new(
            Opts::new("gridmesh_ledger_failures_total", "Ledger call failures"),
            &["operation"],
        )?;

        let energy_bought_kwh = Gauge::new(
            "gridmesh_energy_bought_kwh",
            "Cumulative energy bought in kWh",
        )?;

        let energy_sold_kwh =
            Gauge::new("gridmesh_energy_sold_kwh", "Cumulative energy sold in kWh")?;

        registry.register(Box::new(statuses_ingested.clone()))?;
        registry.register(Box::new(bundles_dispatched.clone()))?;
        registry.register(Box::new(dispatch_deferred.clone()))?;
        registry.register(Box::new(bus_send_failures.clone()))?;
        registry.register(Box::new(auctions_started.clone()))?;
        registry.register(Box::new(bids_placed.clone()))?;
        registry.register(Box::new(reveals_submitted.clone()))?;
        registry.register(Box::new(closes.clone()))?;
        registry.register(Box::new(ledger_failures.clone()))?;
        registry.register(Box::new(energy_bought_kwh.clone()))?;
        registry.register(Box::new(energy_sold_kwh.clone()))?;

        Ok(Self {
            registry,
            statuses_ingested,
            bundles_dispatched,
            dispatch_deferred,
            bus_send_failures,
            auctions_started,
            bids_placed,
            reveals_submitted,
            closes,
            ledger_failures,
            energy_bought_kwh,
            energy_sold_kwh,
        })
    }

    /// Encode all registered metrics in Prometheus text format.
    pub fn export(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
