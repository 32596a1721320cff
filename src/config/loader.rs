//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::domain::message::AgentRole;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
    let path = Path::new(path);

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: AppConfig =
        toml::from_str(&content).with_context(|| "Failed to parse config.toml")?;

    validate_config(&config)?;

    info!(
        node = %config.node.name,
        consumers = config.hub.dependencies.len(),
        freshness_seconds = config.hub.freshness_seconds,
        tick_seconds = config.hub.tick_seconds,
        "Configuration loaded successfully"
    );

    Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Positive timing values
/// - A dependency graph free of self-dependencies and duplicates
/// - Positive pricing factors
/// - Non-empty ledger and forecaster endpoints
fn validate_config(config: &AppConfig) -> Result<()> {
    // Node validation
    anyhow::ensure!(!config.node.name.is_empty(), "node.name must not be empty");

    // Hub validation
    anyhow::ensure!(
        config.hub.tick_seconds > 0,
        "hub.tick_seconds must be positive"
    );
    anyhow::ensure!(
        config.hub.freshness_seconds > 0,
        "hub.freshness_seconds must be positive"
    );
    anyhow::ensure!(
        !config.hub.dependencies.is_empty(),
        "hub.dependencies must define at least one consumer"
    );

    for (consumer, deps) in &config.hub.dependencies {
        for dep in deps {
            anyhow::ensure!(
                dep != consumer,
                "consumer '{consumer}' depends on itself"
            );
        }
        let mut seen: Vec<AgentRole> = Vec::with_capacity(deps.len());
        for dep in deps {
            anyhow::ensure!(
                !seen.contains(dep),
                "consumer '{consumer}' lists dependency '{dep}' twice"
            );
            seen.push(*dep);
        }
    }

    // Auction validation
    anyhow::ensure!(
        config.auction.epsilon_kw >= 0.0,
        "auction.epsilon_kw must be non-negative, got {}",
        config.auction.epsilon_kw
    );
    anyhow::ensure!(
        config.auction.summary_interval_seconds > 0,
        "auction.summary_interval_seconds must be positive"
    );

    // Pricing validation
    for (name, factor) in [
        ("aggressive_factor", config.pricing.aggressive_factor),
        ("neutral_factor", config.pricing.neutral_factor),
        ("conservative_factor", config.pricing.conservative_factor),
    ] {
        anyhow::ensure!(
            factor > 0.0,
            "pricing.{name} must be positive, got {factor}"
        );
    }

    // Ledger validation
    anyhow::ensure!(
        !config.ledger.rpc_url.is_empty(),
        "ledger.rpc_url must not be empty"
    );
    anyhow::ensure!(
        !config.ledger.contract_address.is_empty(),
        "ledger.contract_address must not be empty"
    );
    anyhow::ensure!(config.ledger.chain_id > 0, "ledger.chain_id must be positive");
    anyhow::ensure!(
        config.ledger.gas_limit > 0,
        "ledger.gas_limit must be positive"
    );

    // Forecaster validation
    anyhow::ensure!(
        !config.forecaster.url.is_empty(),
        "forecaster.url must not be empty"
    );
    anyhow::ensure!(
        config.forecaster.sample_length > 0,
        "forecaster.sample_length must be positive"
    );

    // Bus validation
    anyhow::ensure!(config.bus.capacity > 0, "bus.capacity must be positive");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_and_validate_minimal_config() {
        let toml = r#"
            [node]
            name = "mainhouse"

            [hub]
            [hub.dependencies]
            negotiator = ["house", "forecaster", "curtailment", "dashboard"]
            forecaster = ["house"]

            [ledger]
            rpc_url = "http://127.0.0.1:8545"
            contract_address = "0x00000000000000000000000000000000deadbeef"
            chain_id = 1337

            [forecaster]
            url = "http://127.0.0.1:8600"
        "#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        validate_config(&config).unwrap();

        assert_eq!(config.hub.tick_seconds, 5);
        assert_eq!(config.hub.freshness_seconds, 30);
        assert_eq!(config.auction.epsilon_kw, 0.1);
        assert_eq!(config.pricing.neutral_factor, 1.0);
        assert_eq!(
            config.hub.dependencies[&AgentRole::Negotiator],
            vec![
                AgentRole::House,
                AgentRole::Forecaster,
                AgentRole::Curtailment,
                AgentRole::Dashboard
            ]
        );
    }

    #[test]
    fn test_self_dependency_rejected() {
        let toml = r#"
            [node]
            name = "mainhouse"

            [hub]
            [hub.dependencies]
            negotiator = ["negotiator"]

            [ledger]
            rpc_url = "http://127.0.0.1:8545"
            contract_address = "0xdead"
            chain_id = 1337

            [forecaster]
            url = "http://127.0.0.1:8600"
        "#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        assert!(validate_config(&config).is_err());
    }
}
