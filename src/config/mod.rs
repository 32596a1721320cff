//! Configuration Module - TOML-based Node Configuration
//!
//! Loads and validates configuration from `config.toml` with the signing
//! key supplied via environment variable. The dependency graph, ledger
//! contract address and all timing parameters are externalized here -
//! nothing is hardcoded in the domain layer.

pub mod loader;

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::message::AgentRole;

/// Top-level node configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before any agent starts.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Node identity and metadata.
    pub node: NodeConfig,
    /// Message bus parameters.
    #[serde(default)]
    pub bus: BusConfig,
    /// Dependency-resolution hub parameters.
    pub hub: HubConfig,
    /// Auction coordinator parameters.
    #[serde(default)]
    pub auction: AuctionConfig,
    /// Bid pricing policy factors.
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Ledger (auction contract) connection.
    pub ledger: LedgerConfig,
    /// External forecaster service.
    pub forecaster: ForecasterConfig,
    /// Audit log persistence.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Metrics and health endpoints.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Node identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Human-readable node name.
    pub name: String,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Prefix for the bid nonce; the node name is appended to keep the
    /// nonce unique per coordinator instance.
    #[serde(default = "default_nonce_prefix")]
    pub nonce_prefix: String,
}

/// Message bus configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    /// Mailbox capacity per address. A full mailbox drops the message
    /// (at-most-once delivery).
    #[serde(default = "default_bus_capacity")]
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: default_bus_capacity(),
        }
    }
}

/// Dependency-resolution hub configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Evaluation tick in seconds (independent of the freshness window).
    #[serde(default = "default_hub_tick")]
    pub tick_seconds: u64,
    /// Maximum age in seconds a cached status may have and still count
    /// as fresh for aggregation.
    #[serde(default = "default_freshness")]
    pub freshness_seconds: u64,
    /// Static dependency graph: consumer role → required producer roles.
    pub dependencies: HashMap<AgentRole, Vec<AgentRole>>,
}

/// Auction coordinator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuctionConfig {
    /// Dead band in kW around a balanced energy budget; deltas inside it
    /// trigger no trading action.
    #[serde(default = "default_epsilon")]
    pub epsilon_kw: f64,
    /// Bounded wait on the coordinator mailbox per cycle.
    #[serde(default = "default_auction_receive_timeout")]
    pub receive_timeout_seconds: u64,
    /// Pause after a close attempt before the next cycle.
    #[serde(default = "default_post_close_pause")]
    pub post_close_pause_seconds: u64,
    /// Pause at the end of an ordinary cycle.
    #[serde(default = "default_cycle_pause")]
    pub cycle_pause_seconds: u64,
    /// Extended sleep after a detected ledger disconnect.
    #[serde(default = "default_disconnect_backoff")]
    pub disconnect_backoff_seconds: u64,
    /// Period of the cumulative trade summary snapshot.
    #[serde(default = "default_summary_interval")]
    pub summary_interval_seconds: u64,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            epsilon_kw: default_epsilon(),
            receive_timeout_seconds: default_auction_receive_timeout(),
            post_close_pause_seconds: default_post_close_pause(),
            cycle_pause_seconds: default_cycle_pause(),
            disconnect_backoff_seconds: default_disconnect_backoff(),
            summary_interval_seconds: default_summary_interval(),
        }
    }
}

/// Bid pricing policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Factor applied to the market price under the aggressive strategy.
    #[serde(default = "default_aggressive_factor")]
    pub aggressive_factor: f64,
    /// Factor under the neutral strategy.
    #[serde(default = "default_neutral_factor")]
    pub neutral_factor: f64,
    /// Factor under the conservative strategy.
    #[serde(default = "default_conservative_factor")]
    pub conservative_factor: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            aggressive_factor: default_aggressive_factor(),
            neutral_factor: default_neutral_factor(),
            conservative_factor: default_conservative_factor(),
        }
    }
}

/// Ledger connection configuration.
///
/// The contract address is ALWAYS in config - never hardcoded. The
/// signing key comes from the `GRIDMESH_PRIVATE_KEY` environment
/// variable, never from this file.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint of the ledger node.
    pub rpc_url: String,
    /// Deployed Vickrey auction contract address.
    pub contract_address: String,
    /// Expected chain id, validated at startup.
    pub chain_id: u64,
    /// Fixed gas limit for mutating calls.
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
}

/// External forecaster configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecasterConfig {
    /// Base URL of the forecasting service.
    pub url: String,
    /// Fixed historical sample length the model expects.
    #[serde(default = "default_sample_length")]
    pub sample_length: usize,
    /// Request timeout in milliseconds.
    #[serde(default = "default_forecast_timeout")]
    pub timeout_ms: u64,
}

/// Audit persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// Directory for JSONL audit logs.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Metrics and health endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus /metrics endpoint.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// HTTP bind address for /live, /ready, /metrics and /strategy.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: default_bind_address(),
        }
    }
}

// Default value functions for serde

fn default_log_level() -> String {
    "info".to_string()
}

fn default_nonce_prefix() -> String {
    "mainhouse".to_string()
}

fn default_bus_capacity() -> usize {
    64
}

fn default_hub_tick() -> u64 {
    5
}

fn default_freshness() -> u64 {
    30
}

fn default_epsilon() -> f64 {
    0.1
}

fn default_auction_receive_timeout() -> u64 {
    10
}

fn default_post_close_pause() -> u64 {
    5
}

fn default_cycle_pause() -> u64 {
    3
}

fn default_disconnect_backoff() -> u64 {
    20
}

fn default_summary_interval() -> u64 {
    45
}

fn default_aggressive_factor() -> f64 {
    1.10
}

fn default_neutral_factor() -> f64 {
    1.00
}

fn default_conservative_factor() -> f64 {
    0.90
}

fn default_gas_limit() -> u64 {
    3_000_000
}

fn default_sample_length() -> usize {
    18
}

fn default_forecast_timeout() -> u64 {
    5_000
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    "0.0.0.0:9090".to_string()
}
