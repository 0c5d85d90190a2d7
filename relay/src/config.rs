use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Resource API URL must use http or https: {0}")]
    InvalidApiScheme(String),

    #[error("Resource API timeout cannot be 0")]
    InvalidTimeout,
}

/// Relay configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Browser-facing listener
    pub listener: Listener,
    /// Admin listener for health and readiness probes
    pub admin_listener: Listener,
    /// The resource API every browser action is forwarded to
    pub api: ApiConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        self.api.validate()
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Base URL of the resource API, e.g. "http://127.0.0.1:5001"
    pub url: Url,
    /// Applies to the whole round trip of each upstream call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !matches!(self.url.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidApiScheme(self.url.to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            listener: Listener {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            admin_listener: Listener {
                host: "127.0.0.1".to_string(),
                port: 5100,
            },
            api: ApiConfig {
                url: Url::parse("http://127.0.0.1:5001").unwrap(),
                timeout_secs: 30,
            },
        }
    }

    #[test]
    fn test_parse_valid_config() {
        let yaml = r#"
listener:
    host: "0.0.0.0"
    port: 5000
admin_listener:
    host: "127.0.0.1"
    port: 5100
api:
    url: "http://127.0.0.1:5001"
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config, base_config());
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = base_config();
        config.listener.port = 0;
        assert!(matches!(
            config.validate().unwrap_err(),
            ValidationError::InvalidPort
        ));

        let mut config = base_config();
        config.api.url = Url::parse("ftp://127.0.0.1").unwrap();
        assert!(matches!(
            config.validate().unwrap_err(),
            ValidationError::InvalidApiScheme(_)
        ));

        let mut config = base_config();
        config.api.timeout_secs = 0;
        assert!(matches!(
            config.validate().unwrap_err(),
            ValidationError::InvalidTimeout
        ));
    }

    #[test]
    fn test_deserialization_errors() {
        // Invalid URL
        assert!(
            serde_yaml::from_str::<Config>(
                r#"
listener: {host: "0.0.0.0", port: 5000}
admin_listener: {host: "127.0.0.1", port: 5100}
api: {url: "not-a-url"}
"#
            )
            .is_err()
        );

        // Missing api section
        assert!(
            serde_yaml::from_str::<Config>(
                r#"
listener: {host: "0.0.0.0", port: 5000}
admin_listener: {host: "127.0.0.1", port: 5100}
"#
            )
            .is_err()
        );
    }
}
