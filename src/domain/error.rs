//! Error taxonomy for agent loops.
//!
//! Every failure inside an agent cycle maps to one of four classes, and
//! the class decides the recovery policy:
//!
//! - `Setup` halts the affected agent permanently (the supervisor never
//!   restarts it); siblings are unaffected.
//! - `Transient` ends the cycle early and is retried on the next tick,
//!   with a fixed extended sleep after a detected ledger disconnect.
//! - `DataShape` ends the cycle with no state mutation.
//! - `Consistency` is logged and skipped with no state change.
//!
//! Nothing is surfaced synchronously to callers beyond boolean success
//! from the coordinator's mutating operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Missing required external resource at startup.
    #[error("setup failed: {0}")]
    Setup(String),

    /// Ledger RPC or bus delivery failure; retried next tick.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Malformed or incomplete inbound payload.
    #[error("malformed payload: {0}")]
    DataShape(String),

    /// Unregistered sender, stale dependency, or similar oddity.
    #[error("consistency warning: {0}")]
    Consistency(String),
}

impl AgentError {
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn data_shape(msg: impl Into<String>) -> Self {
        Self::DataShape(msg.into())
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency(msg.into())
    }

    /// Whether the owning agent must be permanently disabled.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Setup(_))
    }
}
