//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the domain/usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `MessageBus`: role-addressed envelope delivery between agents
//! - `AuctionLedger`: sealed-bid auction protocol calls + authoritative timestamps
//! - `AuditSink`: append-only trade ledger and summary persistence
//! - `ForecastService`: external pretrained forecasting model

pub mod audit;
pub mod bus;
pub mod forecast;
pub mod ledger;
