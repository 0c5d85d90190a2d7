use relay::config::Config as RelayConfig;
use resource_api::config::Config as ResourceApiConfig;
use serde::Deserialize;
use shared::session::{SessionConfig, SessionConfigError};
use std::fs::File;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

fn default_level() -> String {
    "info".into()
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub sentry_dsn: Option<String>,
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_level")]
    pub level: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    pub relay: Option<RelayConfig>,
    pub resource_api: Option<ResourceApiConfig>,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data: Config = serde_yaml::from_reader(file)?;
        data.validate()?;

        Ok(data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sessions.validate()?;
        if let Some(relay) = &self.relay {
            relay.validate()?;
        }
        if let Some(resource_api) = &self.resource_api {
            resource_api.validate()?;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid sessions config: {0}")]
    Sessions(#[from] SessionConfigError),
    #[error("invalid relay config: {0}")]
    Relay(#[from] relay::config::ValidationError),
    #[error("invalid resource_api config: {0}")]
    ResourceApi(#[from] resource_api::config::ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::model::Role;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn full_config() {
        let yaml = r#"
            logging:
                sentry_dsn: https://key@sentry.example.com/1
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            sessions:
                cookie_name: erms_session
                sessions:
                    - token: admin-token
                      user: admin@company.com
                      role: Admin
            relay:
                listener: {host: 0.0.0.0, port: 5000}
                admin_listener: {host: 127.0.0.1, port: 5100}
                api:
                    url: http://127.0.0.1:5001
                    timeout_secs: 10
            resource_api:
                listener: {host: 0.0.0.0, port: 5001}
                admin_listener: {host: 127.0.0.1, port: 5101}
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        let logging = config.common.logging.expect("logging config");
        assert_eq!(logging.level, "info");
        assert!(logging.sentry_dsn.is_some());
        assert_eq!(config.common.metrics.expect("metrics").statsd_port, 8125);
        assert_eq!(config.sessions.sessions[0].role, Role::Admin);

        let relay = config.relay.expect("relay config");
        assert_eq!(relay.api.timeout_secs, 10);
        assert_eq!(relay.api.url.as_str(), "http://127.0.0.1:5001/");
        assert!(config.resource_api.is_some());
    }

    #[test]
    fn minimal_config() {
        let yaml = r#"
            resource_api:
                listener: {host: 0.0.0.0, port: 5001}
                admin_listener: {host: 127.0.0.1, port: 5101}
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.common, CommonConfig::default());
        assert_eq!(config.sessions, SessionConfig::default());
        assert!(config.relay.is_none());
    }

    #[test]
    fn invalid_configs() {
        let missing = Config::from_file(std::path::Path::new("/nonexistent/erms.yaml"));
        assert!(matches!(missing, Err(ConfigError::LoadError(_))));

        let tmp = write_tmp_file("relay: [not, a, map]");
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::ParseError(_))
        ));

        let tmp = write_tmp_file(
            r#"
            relay:
                listener: {host: 0.0.0.0, port: 0}
                admin_listener: {host: 127.0.0.1, port: 5100}
                api: {url: "http://127.0.0.1:5001"}
            "#,
        );
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::Relay(_))
        ));

        let tmp = write_tmp_file("sessions: {cookie_name: ''}");
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::Sessions(_))
        ));
    }
}
