//! Forecast Service Port - Pretrained Model Call Contract
//!
//! The forecasting model itself is an external collaborator; this trait
//! captures its fixed call contract: a fixed-length historical sample in,
//! two scalars out. Failure returns an error, never a partial result.

use async_trait::async_trait;

/// Forecaster output for the local home.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forecast {
    /// Predicted demand in kW.
    pub predicted_demand: f64,
    /// Predicted production in kW.
    pub predicted_production: f64,
}

/// Trait for the external forecasting service.
#[async_trait]
pub trait ForecastService: Send + Sync + 'static {
    /// Number of historical samples the model expects.
    fn sample_length(&self) -> usize;

    /// Run one prediction over a window of exactly `sample_length()`
    /// demand samples.
    async fn predict(&self, samples: &[f64]) -> anyhow::Result<Forecast>;

    /// Whether the service is reachable.
    async fn is_healthy(&self) -> bool;
}
