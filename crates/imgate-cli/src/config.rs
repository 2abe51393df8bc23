//! imgate CLI Configuration
//!
//! The CLI reads a single TOML file with a `[gateway]` section for the
//! runtime and a `[loopback]` section for the simulated IM network. Missing
//! keys fall back to their defaults; command line flags are applied on top.

use std::path::Path;

use imgate_core::GatewayConfig;
use imgate_harness::LoopbackConfig;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Runtime timeouts, channel sizing and device flags
    pub gateway: GatewayConfig,
    /// Behaviour of the in-process IM network
    pub loopback: LoopbackConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            CliError::Config(format!("Failed to read {}: {}", path.display(), err))
        })?;
        let config = Self::from_toml(&contents)?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.gateway.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [gateway]
            require_local_address = true

            [gateway.timeouts]
            login_timeout_secs = 5

            [loopback]
            connect_latency_ms = 20
            "#,
        )
        .unwrap();

        assert!(config.gateway.require_local_address);
        assert_eq!(config.gateway.timeouts.login_timeout_secs, 5);
        assert_eq!(config.gateway.timeouts.queue_flush_delay_secs, 10);
        assert_eq!(config.loopback.connect_latency_ms, 20);
        assert_eq!(config.loopback.buddies, LoopbackConfig::default().buddies);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(AppConfig::from_toml("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = AppConfig::from_toml("[gateway.channels]\ncommand_buffer_size = 0\n");
        assert!(matches!(result, Err(CliError::Gateway(_))));

        let result = AppConfig::from_toml("[gateway\n");
        assert!(matches!(result, Err(CliError::TomlParsing(_))));
    }

    #[test]
    fn test_printed_config_loads_back() {
        let mut config = AppConfig::default();
        config.gateway.timeouts.login_timeout_secs = 45;
        let printed = config.to_toml().unwrap();
        assert!(printed.contains("login_timeout_secs = 45"));
        assert_eq!(AppConfig::from_toml(&printed).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let result = AppConfig::load_from_file("/nonexistent/imgate.toml");
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
