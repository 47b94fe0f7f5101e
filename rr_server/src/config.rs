//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use round_robin::db::DatabaseConfig;
use round_robin::tournament::ManagerConfig;
use std::net::SocketAddr;

const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Shortest accepted admin token
const MIN_ADMIN_TOKEN_LEN: usize = 16;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration; `None` runs on in-memory stores
    pub database: Option<DatabaseConfig>,
    /// Prometheus scrape address; `None` disables the exporter
    pub metrics_bind: Option<SocketAddr>,
    /// Tournament policy
    pub manager: ManagerConfig,
    /// Lichess token used to open challenges in automode
    pub lichess_token: Option<String>,
    /// Bearer token for admin endpoints; unset disables them
    pub admin_token: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `metrics_bind_override` - Optional metrics address override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        metrics_bind_override: Option<SocketAddr>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_addr_env("SERVER_BIND")?.unwrap_or(default_bind()?),
        };

        let database = database_url_override
            .or_else(|| non_empty_env("DATABASE_URL"))
            .map(|url| DatabaseConfig::from_env().with_url(url));

        let metrics_bind = match metrics_bind_override {
            Some(addr) => Some(addr),
            None => parse_addr_env("METRICS_BIND")?,
        };

        Ok(ServerConfig {
            bind,
            database,
            metrics_bind,
            manager: ManagerConfig::from_env(),
            lichess_token: non_empty_env("LICHESS_API_TOKEN"),
            admin_token: non_empty_env("ADMIN_TOKEN"),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.manager
            .validate()
            .map_err(|e| ConfigError::Invalid {
                var: "TOURNAMENT_*".to_string(),
                reason: e.to_string(),
            })?;

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server address ({})", self.bind),
            });
        }

        if let Some(token) = &self.admin_token
            && token.len() < MIN_ADMIN_TOKEN_LEN
        {
            return Err(ConfigError::Invalid {
                var: "ADMIN_TOKEN".to_string(),
                reason: format!("Must be at least {MIN_ADMIN_TOKEN_LEN} characters"),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> Result<SocketAddr, ConfigError> {
    DEFAULT_BIND.parse().map_err(|_| ConfigError::Invalid {
        var: "SERVER_BIND".to_string(),
        reason: format!("Default {DEFAULT_BIND} is not an address"),
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Unlike the other settings, a malformed address is an error rather than a default
fn parse_addr_env(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    non_empty_env(key)
        .map(|value| {
            value.parse().map_err(|_| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("{value} is not a socket address"),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            database: None,
            metrics_bind: None,
            manager: ManagerConfig::default(),
            lichess_token: None,
            admin_token: None,
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "SERVER_BIND".to_string(),
            reason: "not an address".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("SERVER_BIND"));
        assert!(msg.contains("not an address"));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_capacity() {
        let mut config = config();
        config.manager.capacity = 11;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_config_validation_metrics_bind_clash() {
        let mut config = config();
        config.metrics_bind = Some(config.bind);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_short_admin_token() {
        let mut config = config();
        config.admin_token = Some("short".to_string());
        assert!(config.validate().is_err());
        config.admin_token = Some("a".repeat(32));
        assert!(config.validate().is_ok());
    }
}
