use std::fs;
use std::path::Path;
use crate::shared::types::ClientConfig;
use crate::shared::errors::AppError;

/// Default configuration file name
pub const DEFAULT_CONFIG_PATH: &str = "Config.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<ClientConfig, AppError> {
        let config_content = fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::ConfigError(format!("Failed to read config file: {}", e)))?;

        Self::parse(&config_content)
    }

    /// Load the file when it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<ClientConfig, AppError> {
        if path.as_ref().exists() {
            Self::load_from(path)
        } else {
            Ok(ClientConfig::default())
        }
    }

    pub fn parse(config_content: &str) -> Result<ClientConfig, AppError> {
        toml::from_str(config_content)
            .map_err(|e| AppError::ConfigError(format!("Failed to parse config file: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ConfigLoader::parse("").unwrap();
        assert_eq!(config.network.chain_id, 11155111);
        assert!(config.transport.is_none());
        assert_eq!(config.watch.poll_interval_ms, 4_000);
        assert!(config.rpc_endpoints.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = ConfigLoader::parse(
            r#"
            [network]
            chain_id = 4202

            [transport]
            batch = false
            retry_count = 5

            [watch]
            poll_interval_ms = 1000

            [[rpc_endpoints]]
            chain_id = 11155111
            url = "http://localhost:8545"
            "#,
        )
        .unwrap();

        assert_eq!(config.network.chain_id, 4202);
        let transport = config.transport.clone().unwrap();
        assert!(!transport.batch);
        assert_eq!(transport.retry_count, 5);
        assert_eq!(transport.retry_delay_ms, 150);
        assert_eq!(config.watch.poll_interval_ms, 1000);
        assert_eq!(config.watch.refresh_interval_ms, 30_000);
        assert_eq!(config.rpc_url_for(11155111), Some("http://localhost:8545"));
        assert_eq!(config.rpc_url_for(4202), None);
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let err = ConfigLoader::parse("network = 3").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
