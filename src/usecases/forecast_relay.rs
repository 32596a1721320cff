//! Forecast Relay - Demand Prediction Publishing
//!
//! Bridges the external demand prediction service onto the bus. The
//! relay consumes house status bundles from the hub, maintains a
//! sliding window of recent demand samples, and once the window is
//! full asks the forecaster for a prediction, publishing the result
//! back to the hub as a forecast status.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::{AgentError, AgentRole, BusAddress, BusMessage, StatusPayload};
use crate::ports::bus::{Mailbox, MessageBus};
use crate::ports::forecast::ForecastService;

/// Relays demand samples to the prediction service and forecasts back
/// to the hub.
pub struct ForecastRelay<B: MessageBus, F: ForecastService> {
    bus: Arc<B>,
    forecaster: Arc<F>,
    /// Sliding window of recent demand samples, newest last.
    window: VecDeque<f64>,
}

impl<B: MessageBus, F: ForecastService> ForecastRelay<B, F> {
    pub fn new(bus: Arc<B>, forecaster: Arc<F>) -> Self {
        Self {
            bus,
            forecaster,
            window: VecDeque::new(),
        }
    }

    /// Probe the prediction service before entering the loop.
    ///
    /// An unreachable forecaster at startup is a setup error: the agent
    /// is disabled rather than left spinning against a dead endpoint.
    pub async fn connect(&self) -> Result<(), AgentError> {
        if self.forecaster.is_healthy().await {
            info!("Forecast service reachable");
            Ok(())
        } else {
            Err(AgentError::setup("Forecast service unreachable at startup"))
        }
    }

    /// Record one demand sample, keeping the window at sample length.
    fn push_sample(&mut self, demand: f64) {
        let capacity = self.forecaster.sample_length();
        self.window.push_back(demand);
        while self.window.len() > capacity {
            self.window.pop_front();
        }
    }

    /// Predict from the current window and publish the forecast.
    async fn publish_forecast(&self) {
        let samples: Vec<f64> = self.window.iter().copied().collect();

        let forecast = match self.forecaster.predict(&samples).await {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "Prediction request failed");
                return;
            }
        };

        let body = json!({
            "predicted_demand": forecast.predicted_demand,
            "predicted_production": forecast.predicted_production,
        });
        let message = BusMessage::Status {
            from: AgentRole::Forecaster,
            body,
        };

        if let Err(e) = self.bus.send(BusAddress::Hub, message).await {
            warn!(error = %e, "Failed to publish forecast");
        }
    }

    /// Extract the demand sample from a bundle, if it carries one.
    fn demand_from(message: &BusMessage) -> Option<f64> {
        match message {
            BusMessage::Bundle(bundle) => match bundle.get(AgentRole::House) {
                Some(StatusPayload::House(house)) => Some(house.current_demand),
                Some(_) => {
                    debug!("House payload in bundle is not typed, skipping sample");
                    None
                }
                None => None,
            },
            BusMessage::Status { .. } => None,
        }
    }

    /// Run the relay loop until shutdown is signalled.
    pub async fn run(
        mut self,
        mut mailbox: Mailbox,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        self.connect().await?;
        info!(
            sample_length = self.forecaster.sample_length(),
            "Forecast relay started"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Forecast relay shutting down");
                    return Ok(());
                }
                message = mailbox.recv() => {
                    let Some(message) = message else {
                        warn!("Forecast relay mailbox closed, stopping");
                        return Ok(());
                    };
                    if let Some(demand) = Self::demand_from(&message) {
                        self.push_sample(demand);
                        if self.window.len() == self.forecaster.sample_length() {
                            self.publish_forecast().await;
                        } else {
                            debug!(
                                samples = self.window.len(),
                                needed = self.forecaster.sample_length(),
                                "Warming up sample window"
                            );
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::bus::MemoryBus;
    use crate::domain::{Bundle, HouseStatus};
    use crate::ports::forecast::Forecast;
    use anyhow::Result;
    use async_trait::async_trait;

    struct FixedForecaster;

    #[async_trait]
    impl ForecastService for FixedForecaster {
        fn sample_length(&self) -> usize {
            3
        }

        async fn predict(&self, samples: &[f64]) -> Result<Forecast> {
            Ok(Forecast {
                predicted_demand: samples.iter().sum::<f64>() / samples.len() as f64,
                predicted_production: 0.0,
            })
        }

        async fn is_healthy(&self) -> bool {
            true
        }
    }

    fn house_bundle(demand: f64) -> BusMessage {
        let mut bundle = Bundle::default();
        bundle.insert(
            AgentRole::House,
            StatusPayload::House(HouseStatus {
                current_production: 0.0,
                current_demand: demand,
            }),
        );
        BusMessage::Bundle(bundle)
    }

    #[tokio::test]
    async fn window_slides_and_publishes_when_full() {
        let mut bus = MemoryBus::new(8);
        let mut hub_mailbox = bus.register(BusAddress::Hub);
        let bus = Arc::new(bus);

        let mut relay = ForecastRelay::new(Arc::clone(&bus), Arc::new(FixedForecaster));

        for demand in [1.0, 2.0] {
            if let Some(d) = ForecastRelay::<MemoryBus, FixedForecaster>::demand_from(&house_bundle(demand)) {
                relay.push_sample(d);
            }
        }
        assert_eq!(relay.window.len(), 2);

        relay.push_sample(3.0);
        relay.publish_forecast().await;

        let message = hub_mailbox.recv().await.unwrap();
        match message {
            BusMessage::Status { from, body } => {
                assert_eq!(from, AgentRole::Forecaster);
                assert_eq!(body["predicted_demand"], 2.0);
            }
            other => panic!("expected forecast status, got {other:?}"),
        }
    }

    #[test]
    fn window_never_exceeds_sample_length() {
        let bus = Arc::new(MemoryBus::new(8));
        let mut relay = ForecastRelay::new(bus, Arc::new(FixedForecaster));

        for demand in [1.0, 2.0, 3.0, 4.0, 5.0] {
            relay.push_sample(demand);
        }
        assert_eq!(relay.window.len(), 3);
        assert_eq!(relay.window.front().copied(), Some(3.0));
    }

    #[test]
    fn non_house_messages_yield_no_sample() {
        let status = BusMessage::Status {
            from: AgentRole::Grid,
            body: serde_json::json!({"demand": 1.0}),
        };
        assert!(ForecastRelay::<MemoryBus, FixedForecaster>::demand_from(&status).is_none());
    }
}
