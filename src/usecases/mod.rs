//! Use Cases Layer - Coordination Logic
//!
//! The dependency-resolution hub, the auction coordinator, the
//! forecast relay and the task supervisor. Use cases depend only on
//! the domain and the ports; adapters are injected at wiring time.

pub mod coordinator;
pub mod forecast_relay;
pub mod hub;
pub mod supervisor;

pub use coordinator::AuctionCoordinator;
pub use forecast_relay::ForecastRelay;
pub use hub::DependencyHub;
pub use supervisor::AgentSupervisor;
