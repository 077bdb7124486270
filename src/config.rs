use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub etherscan_api_key: Option<String>,
    pub etherscan_api_url: String,
    pub upstream_timeout: Duration,
    pub http_bind_addr: String,
    pub database_url: String,
    pub gas_server_url: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing ETHERSCAN_API_KEY env var")]
    MissingApiKey,
    #[error("UPSTREAM_TIMEOUT_SECS must be a positive integer, got {0:?}")]
    InvalidTimeout(String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let etherscan_api_key = env::var("ETHERSCAN_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let etherscan_api_url = env::var("ETHERSCAN_API_URL")
            .unwrap_or_else(|_| "https://api.etherscan.io/api".to_string());
        let upstream_timeout = match env::var("UPSTREAM_TIMEOUT_SECS") {
            Ok(raw) => parse_timeout(&raw)?,
            Err(_) => Duration::from_secs(10),
        };

        let http_bind_addr = env::var("HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://data/gas_window.db".to_string());
        let gas_server_url =
            env::var("GAS_SERVER_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

        Ok(Self {
            etherscan_api_key,
            etherscan_api_url,
            upstream_timeout,
            http_bind_addr,
            database_url,
            gas_server_url,
        })
    }

    /// The upstream key is only needed by the proxy server.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.etherscan_api_key
            .as_deref()
            .ok_or(ConfigError::MissingApiKey)
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: Option<&str>) -> Config {
        Config {
            etherscan_api_key: key.map(str::to_string),
            etherscan_api_url: "https://api.etherscan.io/api".to_string(),
            upstream_timeout: Duration::from_secs(10),
            http_bind_addr: "127.0.0.1:3000".to_string(),
            database_url: "sqlite://data/gas_window.db".to_string(),
            gas_server_url: "http://127.0.0.1:3000".to_string(),
        }
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        assert!(matches!(
            config(None).require_api_key(),
            Err(ConfigError::MissingApiKey)
        ));
        assert_eq!(config(Some("abc")).require_api_key().unwrap(), "abc");
    }

    #[test]
    fn timeout_must_be_positive() {
        assert_eq!(parse_timeout(" 5 ").unwrap(), Duration::from_secs(5));
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("soon").is_err());
    }
}
