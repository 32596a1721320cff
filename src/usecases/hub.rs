//! Dependency-Resolution Hub - Status Aggregation and Dispatch
//!
//! Central aggregation point for agent status traffic. Producers push
//! status updates at their own pace; the hub caches the latest payload
//! per role (last write wins) and, on a fixed tick, dispatches an
//! all-or-nothing bundle to every consumer whose full dependency set
//! is present and fresh.
//!
//! Dispatch is level-triggered: a consumer whose dependencies stay
//! fresh receives its bundle again on every tick. Consumers are
//! expected to be idempotent with respect to repeated bundles.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::config::HubConfig;
use crate::domain::{AgentRole, Bundle, BusAddress, BusMessage, StatusPayload};
use crate::ports::bus::{Mailbox, MessageBus};

/// A cached status: the decoded payload and when it arrived.
///
/// Receipt time, not payload validity, defines freshness — a `Raw`
/// payload still counts as present for its role.
#[derive(Debug, Clone)]
struct StatusRecord {
    payload: StatusPayload,
    received_at: u64,
}

/// The dependency-resolution hub.
///
/// Generic over the bus so tests can drive it with an in-memory
/// transport. All time-dependent logic takes an explicit `now` (epoch
/// seconds) so freshness windows are testable without sleeping.
pub struct DependencyHub<B: MessageBus> {
    bus: Arc<B>,
    metrics: Arc<MetricsRegistry>,
    config: HubConfig,
    /// Latest status per producer role, last write wins.
    cache: HashMap<AgentRole, StatusRecord>,
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

impl<B: MessageBus> DependencyHub<B> {
    pub fn new(bus: Arc<B>, metrics: Arc<MetricsRegistry>, config: HubConfig) -> Self {
        Self {
            bus,
            metrics,
            config,
            cache: HashMap::new(),
        }
    }

    /// Whether a producer role appears in any consumer's dependency list.
    fn is_registered(&self, role: AgentRole) -> bool {
        self.config
            .dependencies
            .values()
            .any(|deps| deps.contains(&role))
    }

    /// Ingest one status update at the given time.
    ///
    /// Unregistered producers are dropped with a warning. Malformed
    /// bodies decode to `Raw` and are cached like any other payload.
    pub fn ingest_at(&mut self, now: u64, from: AgentRole, body: Value) {
        if !self.is_registered(from) {
            warn!(role = %from, "Dropping status from unregistered role");
            return;
        }

        let payload = StatusPayload::decode(from, body);
        if matches!(payload, StatusPayload::Raw(_)) {
            warn!(role = %from, "Status body failed validation, caching as raw");
        }

        self.metrics
            .statuses_ingested
            .with_label_values(&[from.as_str()])
            .inc();

        self.cache.insert(
            from,
            StatusRecord {
                payload,
                received_at: now,
            },
        );
    }

    /// Evaluate every consumer's dependency set at the given time.
    ///
    /// Returns one bundle per consumer whose dependencies are all
    /// present and fresh. A single missing or stale dependency defers
    /// the whole bundle — partial bundles are never built.
    pub fn resolve_at(&self, now: u64) -> Vec<(AgentRole, Bundle)> {
        let mut ready = Vec::new();

        for (&consumer, deps) in &self.config.dependencies {
            let mut bundle = Bundle::default();
            let mut complete = true;

            for &dep in deps {
                match self.cache.get(&dep) {
                    Some(record)
                        if now.saturating_sub(record.received_at)
                            <= self.config.freshness_seconds =>
                    {
                        bundle.insert(dep, record.payload.clone());
                    }
                    Some(_) => {
                        debug!(consumer = %consumer, dependency = %dep, "Dependency stale");
                        complete = false;
                        break;
                    }
                    None => {
                        debug!(consumer = %consumer, dependency = %dep, "Dependency missing");
                        complete = false;
                        break;
                    }
                }
            }

            if complete {
                ready.push((consumer, bundle));
            } else {
                self.metrics
                    .dispatch_deferred
                    .with_label_values(&[consumer.as_str()])
                    .inc();
            }
        }

        ready
    }

    /// Dispatch resolved bundles to their consumers.
    ///
    /// A send failure for one consumer is logged and does not affect
    /// delivery to the others.
    async fn dispatch(&self, bundles: Vec<(AgentRole, Bundle)>) {
        for (consumer, bundle) in bundles {
            let destination = BusAddress::Role(consumer);
            match self
                .bus
                .send(destination, BusMessage::Bundle(bundle))
                .await
            {
                Ok(()) => {
                    self.metrics
                        .bundles_dispatched
                        .with_label_values(&[consumer.as_str()])
                        .inc();
                }
                Err(e) => {
                    warn!(consumer = %consumer, error = %e, "Bundle dispatch failed");
                    self.metrics
                        .bus_send_failures
                        .with_label_values(&[consumer.as_str()])
                        .inc();
                }
            }
        }
    }

    /// Run the hub loop until shutdown is signalled.
    ///
    /// Ingests continuously and evaluates dependencies on a fixed tick.
    pub async fn run(
        mut self,
        mut mailbox: Mailbox,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        info!(
            consumers = self.config.dependencies.len(),
            tick_seconds = self.config.tick_seconds,
            "Dependency hub started"
        );

        let mut tick = tokio::time::interval(Duration::from_secs(self.config.tick_seconds));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Dependency hub shutting down");
                    return Ok(());
                }
                message = mailbox.recv() => {
                    match message {
                        Some(BusMessage::Status { from, body }) => {
                            self.ingest_at(epoch_secs(), from, body);
                        }
                        Some(BusMessage::Bundle(_)) => {
                            warn!("Ignoring bundle addressed to the hub");
                        }
                        None => {
                            warn!("Hub mailbox closed, stopping");
                            return Ok(());
                        }
                    }
                }
                _ = tick.tick() => {
                    let ready = self.resolve_at(epoch_secs());
                    if !ready.is_empty() {
                        self.dispatch(ready).await;
                    }
                }
            }
        }
    }
}
