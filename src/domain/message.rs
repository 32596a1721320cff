//! Core messaging domain types.
//!
//! Defines the agent roles, the tagged status envelope exchanged over the
//! bus, the aggregated bundle the hub dispatches, and the market snapshot
//! the coordinator extracts from a bundle.
//!
//! Payloads are validated at the boundary: a body that fails to decode for
//! its role is stored as `StatusPayload::Raw` — presence in the status
//! cache is defined by receipt, not validity, and downstream consumers
//! must tolerate raw values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::AgentError;

// ────────────────────────────────────────────
// Roles and addressing
// ────────────────────────────────────────────

/// The fixed set of agent roles in the system.
///
/// The set is closed at configuration time; a message from any other
/// sender is a consistency warning and is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Household meter: current production and demand.
    House,
    /// Demand/production forecaster.
    Forecaster,
    /// Curtailment-rate calculator (also supplies the market rate).
    Curtailment,
    /// Dashboard front-end bridge (supplies the trading strategy).
    Dashboard,
    /// Auction coordinator (consumer of the market bundle).
    Negotiator,
    /// Behavioral segmentation agent.
    Segmenter,
    /// Grid-level supply/demand reporter.
    Grid,
}

impl AgentRole {
    /// All roles, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::House,
        Self::Forecaster,
        Self::Curtailment,
        Self::Dashboard,
        Self::Negotiator,
        Self::Segmenter,
        Self::Grid,
    ];

    /// Snake-case name used in envelopes, config, and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::House => "house",
            Self::Forecaster => "forecaster",
            Self::Curtailment => "curtailment",
            Self::Dashboard => "dashboard",
            Self::Negotiator => "negotiator",
            Self::Segmenter => "segmenter",
            Self::Grid => "grid",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bus delivery address: either a concrete agent role or the hub itself.
///
/// Producers address their status messages to the hub; the hub addresses
/// aggregated bundles to consumer roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusAddress {
    /// The dependency-resolution hub.
    Hub,
    /// A named agent role.
    Role(AgentRole),
}

impl std::fmt::Display for BusAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hub => f.write_str("hub"),
            Self::Role(role) => f.write_str(role.as_str()),
        }
    }
}

// ────────────────────────────────────────────
// Per-role status payloads
// ────────────────────────────────────────────

/// Trading strategy tag selected on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingStrategy {
    Aggressive,
    #[default]
    Neutral,
    Conservative,
}

impl std::str::FromStr for TradingStrategy {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aggressive" => Ok(Self::Aggressive),
            "neutral" => Ok(Self::Neutral),
            "conservative" => Ok(Self::Conservative),
            other => Err(AgentError::data_shape(format!(
                "unknown trading strategy '{other}'"
            ))),
        }
    }
}

/// Household meter reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HouseStatus {
    /// Current production in kW.
    pub current_production: f64,
    /// Current demand in kW.
    pub current_demand: f64,
}

/// Forecaster output for the local home.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastStatus {
    /// Predicted demand in kW.
    pub predicted_demand: f64,
    /// Predicted production in kW.
    pub predicted_production: f64,
}

/// Curtailment-rate calculator output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurtailmentStatus {
    /// Current market value of energy (ETH per kWh) used for trading.
    pub market_value: f64,
    /// Curtailment signal in kW (0 when no curtailment is requested).
    pub curtailment: f64,
    /// Current time-of-use energy rate (ETH per kWh).
    pub energy_rate: f64,
}

/// Dashboard bridge output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DashboardStatus {
    /// Trading strategy selected by the user.
    pub strategy: TradingStrategy,
}

/// Grid-level supply and demand report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridStatus {
    /// Grid demand in kW.
    pub demand: f64,
    /// Grid supply in kW.
    pub supply: f64,
}

/// Behavioral segmentation label for the household.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentStatus {
    /// Cluster index assigned to the household's consumption profile.
    pub cluster: i64,
}

/// Tagged status payload: one typed variant per producing role, plus a
/// raw fallback for bodies that fail boundary validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", content = "payload", rename_all = "snake_case")]
pub enum StatusPayload {
    House(HouseStatus),
    Forecast(ForecastStatus),
    Curtailment(CurtailmentStatus),
    Dashboard(DashboardStatus),
    Grid(GridStatus),
    Segment(SegmentStatus),
    /// Body that did not decode for its role. Stored and forwarded
    /// verbatim; consumers must tolerate it.
    Raw(Value),
}

impl StatusPayload {
    /// Decode a raw JSON body for the given sender role.
    ///
    /// Falls back to `Raw` on any decode failure — receipt, not validity,
    /// defines presence in the status cache.
    pub fn decode(from: AgentRole, body: Value) -> Self {
        let decoded = match from {
            AgentRole::House => serde_json::from_value(body.clone()).map(Self::House),
            AgentRole::Forecaster => serde_json::from_value(body.clone()).map(Self::Forecast),
            AgentRole::Curtailment => serde_json::from_value(body.clone()).map(Self::Curtailment),
            AgentRole::Dashboard => serde_json::from_value(body.clone()).map(Self::Dashboard),
            AgentRole::Grid => serde_json::from_value(body.clone()).map(Self::Grid),
            AgentRole::Segmenter => serde_json::from_value(body.clone()).map(Self::Segment),
            // The negotiator produces nothing the hub aggregates.
            AgentRole::Negotiator => return Self::Raw(body),
        };
        decoded.unwrap_or(Self::Raw(body))
    }
}

// ────────────────────────────────────────────
// Bus envelope and bundle
// ────────────────────────────────────────────

/// A message travelling over the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BusMessage {
    /// Status update from a producer, body not yet validated.
    Status {
        from: AgentRole,
        body: Value,
    },
    /// Aggregated dependency snapshot dispatched by the hub.
    Bundle(Bundle),
}

/// Aggregated snapshot of every dependency payload for one consumer.
///
/// Built only at dispatch time and never persisted. The hub emits a
/// bundle only when every required dependency is present and fresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle(pub BTreeMap<AgentRole, StatusPayload>);

impl Bundle {
    pub fn insert(&mut self, role: AgentRole, payload: StatusPayload) {
        self.0.insert(role, payload);
    }

    pub fn get(&self, role: AgentRole) -> Option<&StatusPayload> {
        self.0.get(&role)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ────────────────────────────────────────────
// Market snapshot (coordinator boundary)
// ────────────────────────────────────────────

/// The inputs the auction coordinator needs from one bundle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketSnapshot {
    /// Own current production in kW.
    pub production: f64,
    /// Own current demand in kW.
    pub demand: f64,
    /// Current market price in ETH per kWh.
    pub market_price: f64,
    /// Trading strategy selected on the dashboard.
    pub strategy: TradingStrategy,
}

impl MarketSnapshot {
    /// Extract a snapshot from a bundle, rejecting missing or raw payloads.
    ///
    /// The forecast payload may also be present in the bundle but does not
    /// feed the per-cycle decision policy.
    pub fn from_bundle(bundle: &Bundle) -> Result<Self, AgentError> {
        let house = match bundle.get(AgentRole::House) {
            Some(StatusPayload::House(h)) => h,
            Some(_) => return Err(AgentError::data_shape("house payload is not decodable")),
            None => return Err(AgentError::data_shape("bundle is missing house payload")),
        };
        let curtailment = match bundle.get(AgentRole::Curtailment) {
            Some(StatusPayload::Curtailment(c)) => c,
            Some(_) => {
                return Err(AgentError::data_shape("curtailment payload is not decodable"))
            }
            None => return Err(AgentError::data_shape("bundle is missing curtailment payload")),
        };
        let dashboard = match bundle.get(AgentRole::Dashboard) {
            Some(StatusPayload::Dashboard(d)) => d,
            Some(_) => return Err(AgentError::data_shape("dashboard payload is not decodable")),
            None => return Err(AgentError::data_shape("bundle is missing dashboard payload")),
        };

        Ok(Self {
            production: house.current_production,
            demand: house.current_demand,
            market_price: curtailment.market_value,
            strategy: dashboard.strategy,
        })
    }

    /// Production minus demand; negative means a deficit to buy for.
    pub fn energy_delta(&self) -> f64 {
        self.production - self.demand
    }
}
