//! Domain layer - Core coordination logic and models.
//!
//! Pure types and functions for the coordination core: roles and message
//! envelopes, auction phase derivation, close-outcome classification, the
//! bid pricing policy, and local trading state. No I/O dependencies here
//! (hexagonal architecture inner ring); everything is testable in
//! isolation.

pub mod account;
pub mod error;
pub mod message;
pub mod outcome;
pub mod phase;
pub mod pricing;

// Re-export core types for convenience
pub use account::{CumulativeAccount, LocalBidState};
pub use error::AgentError;
pub use message::{
    AgentRole, Bundle, BusAddress, BusMessage, CurtailmentStatus, DashboardStatus, ForecastStatus,
    GridStatus, HouseStatus, MarketSnapshot, SegmentStatus, StatusPayload, TradingStrategy,
};
pub use outcome::{AuctionOutcome, ZERO_ACCOUNT, classify};
pub use phase::{AuctionPhase, AuctionTimings, phase_at};
pub use pricing::BidPricer;
