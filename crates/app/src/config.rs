use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use comment_tree_core::service::{MAX_SEARCH_RESULTS, ServiceConfig};
use comment_tree_infra::db::{PoolSettings, RetryPolicy};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub request_timeout: Duration,
    pub retry_attempts: u32,
    pub retry_base_delay: Duration,
    pub max_search_results: usize,
    pub cors_allow_origins: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid socket address: {0}")]
    InvalidSocket(String),
    #[error("invalid integer for {0}: {1}")]
    InvalidNumber(&'static str, String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
    #[error("dotenv error: {0}")]
    Dotenv(#[from] dotenv::Error),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let env = Env { lookup };
        let http_addr_raw = env.string("COMMENT_TREE_HTTP_ADDR", "127.0.0.1:8080");
        let http_addr = http_addr_raw
            .parse()
            .map_err(|_| ConfigError::InvalidSocket(http_addr_raw.clone()))?;
        let database_url = env.optional_string("COMMENT_TREE_DATABASE_URL");
        let db_max_connections = env.number("COMMENT_TREE_DB_MAX_CONNECTIONS", 10u32)?;
        if db_max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "COMMENT_TREE_DB_MAX_CONNECTIONS",
                db_max_connections.to_string(),
            ));
        }
        let request_timeout_secs = env.number("COMMENT_TREE_REQUEST_TIMEOUT_SECS", 15u64)?;
        let retry_attempts = env.number("COMMENT_TREE_RETRY_ATTEMPTS", 5u32)?;
        let retry_base_delay_ms = env.number("COMMENT_TREE_RETRY_BASE_DELAY_MS", 1u64)?;
        let max_search_results =
            env.number("COMMENT_TREE_MAX_SEARCH_RESULTS", MAX_SEARCH_RESULTS)?;
        if !(1..=MAX_SEARCH_RESULTS).contains(&max_search_results) {
            return Err(ConfigError::InvalidValue(
                "COMMENT_TREE_MAX_SEARCH_RESULTS",
                max_search_results.to_string(),
            ));
        }
        let cors_allow_origins =
            parse_origins(&env.string("COMMENT_TREE_CORS_ALLOW_ORIGINS", ""));

        Ok(Self {
            http_addr,
            database_url,
            db_max_connections,
            request_timeout: Duration::from_secs(request_timeout_secs),
            retry_attempts,
            retry_base_delay: Duration::from_millis(retry_base_delay_ms),
            max_search_results,
            cors_allow_origins,
        })
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.db_max_connections,
            ..PoolSettings::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            base_delay: self.retry_base_delay,
            ..RetryPolicy::default()
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            max_search_results: self.max_search_results,
            ..ServiceConfig::default()
        }
    }
}

/// Loads `.env` when present. Variables already set in the process win.
pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenv::dotenv() {
        Ok(_) => Ok(()),
        Err(dotenv::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&'static str) -> Option<String>,
{
    fn string(&self, key: &'static str, default: &'static str) -> String {
        (self.lookup)(key).unwrap_or_else(|| default.to_string())
    }

    fn optional_string(&self, key: &'static str) -> Option<String> {
        let value = (self.lookup)(key)?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn number<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
    {
        match (self.lookup)(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber(key, raw)),
            None => Ok(default),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&'static str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<&'static str, String> = pairs
            .iter()
            .map(|(key, value)| (*key, value.to_string()))
            .collect();
        AppConfig::from_lookup(move |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.http_addr, "127.0.0.1:8080".parse().unwrap());
        assert!(config.database_url.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.retry_policy().attempts, 5);
        assert_eq!(config.service_config().max_search_results, 50);
        assert!(config.cors_allow_origins.is_empty());
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("COMMENT_TREE_HTTP_ADDR", "0.0.0.0:9000"),
            ("COMMENT_TREE_DATABASE_URL", " postgres://localhost/comments "),
            ("COMMENT_TREE_RETRY_ATTEMPTS", "2"),
            ("COMMENT_TREE_CORS_ALLOW_ORIGINS", "https://a.example, ,https://b.example"),
        ])
        .unwrap();
        assert_eq!(config.http_addr.port(), 9000);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/comments")
        );
        assert_eq!(config.retry_policy().attempts, 2);
        assert_eq!(
            config.cors_allow_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn blank_database_url_means_memory() {
        let config = config_from(&[("COMMENT_TREE_DATABASE_URL", "   ")]).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            config_from(&[("COMMENT_TREE_HTTP_ADDR", "nowhere")]),
            Err(ConfigError::InvalidSocket(_))
        ));
        assert!(matches!(
            config_from(&[("COMMENT_TREE_REQUEST_TIMEOUT_SECS", "soon")]),
            Err(ConfigError::InvalidNumber("COMMENT_TREE_REQUEST_TIMEOUT_SECS", _))
        ));
        assert!(matches!(
            config_from(&[("COMMENT_TREE_MAX_SEARCH_RESULTS", "0")]),
            Err(ConfigError::InvalidValue(_, _))
        ));
        assert!(matches!(
            config_from(&[("COMMENT_TREE_MAX_SEARCH_RESULTS", "500")]),
            Err(ConfigError::InvalidValue("COMMENT_TREE_MAX_SEARCH_RESULTS", _))
        ));
        assert_eq!(
            config_from(&[("COMMENT_TREE_MAX_SEARCH_RESULTS", "50")])
                .unwrap()
                .max_search_results,
            50
        );
    }
}
