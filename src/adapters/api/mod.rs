//! External Service Clients

pub mod forecaster;

pub use forecaster::HttpForecaster;
