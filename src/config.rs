//! Configuration management for CircDesk

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Base URL of the borrow-management REST backend, e.g. "http://host:8080/api".
    pub base_url: String,
    /// Page size used when crawling paginated listings.
    pub page_size: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionConfig {
    /// Initial bearer token; empty means the operator must paste one at the desk.
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for rolling log files (stdout belongs to the desk UI).
    pub directory: String,
    pub file_prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default"))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (with prefix CIRCDESK_)
            .add_source(
                Environment::with_prefix("CIRCDESK")
                    .separator("_")
                    .try_parsing(true),
            )
            // Override backend URL from BACKEND_URL env var if present
            .set_override_option("backend.base_url", env::var("BACKEND_URL").ok())?
            // Override session token from CIRCDESK_SESSION_TOKEN env var if present
            .set_override_option("session.token", env::var("CIRCDESK_SESSION_TOKEN").ok())?
            .build()?;

        config.try_deserialize()
    }

    /// Initial token from configuration, if any was provided.
    pub fn initial_token(&self) -> Option<String> {
        let token = self.session.token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            page_size: 20,
            request_timeout_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: "logs".to_string(),
            file_prefix: "circdesk".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_token_ignores_blank() {
        let config = AppConfig {
            backend: BackendConfig::default(),
            session: SessionConfig {
                token: "   ".to_string(),
            },
            logging: LoggingConfig::default(),
        };
        assert_eq!(config.initial_token(), None);
    }

    #[test]
    fn initial_token_trims() {
        let config = AppConfig {
            backend: BackendConfig::default(),
            session: SessionConfig {
                token: " abc123 ".to_string(),
            },
            logging: LoggingConfig::default(),
        };
        assert_eq!(config.initial_token(), Some("abc123".to_string()));
    }
}
