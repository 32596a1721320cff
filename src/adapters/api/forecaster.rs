//! Demand Forecaster Client - HTTP Prediction Service
//!
//! Implements the `ForecastService` port against the external demand
//! prediction service. The coordinator feeds it a fixed-length window
//! of recent demand samples and gets back predicted demand and
//! production for the next interval.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::ForecasterConfig;
use crate::ports::forecast::{Forecast, ForecastService};

#[derive(Serialize)]
struct PredictRequest<'a> {
    samples: &'a [f64],
}

#[derive(Deserialize)]
struct PredictResponse {
    predicted_demand: f64,
    predicted_production: f64,
}

/// HTTP client for the demand prediction service.
pub struct HttpForecaster {
    client: Client,
    base_url: String,
    sample_length: usize,
}

impl HttpForecaster {
    pub fn new(config: &ForecasterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            sample_length: config.sample_length,
        })
    }
}

#[async_trait]
impl ForecastService for HttpForecaster {
    fn sample_length(&self) -> usize {
        self.sample_length
    }

    #[instrument(skip_all, fields(samples = samples.len()))]
    async fn predict(&self, samples: &[f64]) -> Result<Forecast> {
        if samples.len() != self.sample_length {
            bail!(
                "Forecaster expects {} samples, got {}",
                self.sample_length,
                samples.len()
            );
        }

        let url = format!("{}/predict", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&PredictRequest { samples })
            .send()
            .await
            .context("Forecast request failed")?
            .error_for_status()
            .context("Forecast service returned an error status")?;

        let body: PredictResponse = response
            .json()
            .await
            .context("Malformed forecast response")?;

        Ok(Forecast {
            predicted_demand: body.predicted_demand,
            predicted_production: body.predicted_production,
        })
    }

    async fn is_healthy(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}
