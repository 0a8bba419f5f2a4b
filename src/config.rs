//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use serde::Deserialize;
use std::net::Ipv4Addr;
use thiserror::Error;
use tracing::warn;
use url::Url;

const DEV_JWT_SECRET: &str = "clusterflow-dev-secret-change-in-production";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0),
            port: 3000,
        }
    }
}

/// Metadata database; absent means the in-memory store
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_pool_size: usize,
}

/// Cluster api service the HTTP agent talks to
#[derive(Debug, Clone)]
pub struct ClusterApiConfig {
    pub url: Url,
    pub secret: String,
    pub timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3001".to_string()],
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: Option<DatabaseConfig>,
    pub cluster_api: Option<ClusterApiConfig>,
    pub cors: CorsConfig,
    pub jwt_secret: String,
    pub directory_file: String,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        let server = ServerConfig {
            host: var("HOST")
                .and_then(|h| h.parse().ok())
                .unwrap_or_else(|| ServerConfig::default().host),
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(|| ServerConfig::default().port),
        };

        let database = match var("DATABASE_URL") {
            Some(url) => Some(Self::parse_database_url(&url)?),
            None => None,
        };

        let cluster_api = match var("CLUSTER_API_URL") {
            Some(url) => Some(Self::parse_cluster_api(
                &url,
                var("CLUSTER_API_SECRET"),
                var("CLUSTER_API_TIMEOUT_SECS"),
            )?),
            None => None,
        };

        let cors = CorsConfig {
            allowed_origins: var("ALLOWED_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|| CorsConfig::default().allowed_origins),
        };

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using default (INSECURE - set in production!)");
            DEV_JWT_SECRET.to_string()
        });

        Ok(Self {
            server,
            database,
            cluster_api,
            cors,
            jwt_secret,
            directory_file: var("DIRECTORY_FILE").unwrap_or_else(|| "directory.toml".to_string()),
        })
    }

    /// Validate a DATABASE_URL connection string (postgresql://...)
    fn parse_database_url(url: &str) -> Result<DatabaseConfig, ConfigError> {
        let parsed = Url::parse(url).map_err(|_| {
            ConfigError::InvalidValue("Invalid DATABASE_URL format (expected postgresql://...)".to_string())
        })?;

        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(ConfigError::InvalidValue(format!(
                "Unsupported DATABASE_URL scheme '{}'",
                parsed.scheme()
            )));
        }
        if parsed.host_str().is_none() {
            return Err(ConfigError::InvalidValue("Missing host in DATABASE_URL".to_string()));
        }

        Ok(DatabaseConfig {
            url: url.to_string(),
            max_pool_size: var("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        })
    }

    fn parse_cluster_api(
        url: &str,
        secret: Option<String>,
        timeout: Option<String>,
    ) -> Result<ClusterApiConfig, ConfigError> {
        let url = Url::parse(url)
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid CLUSTER_API_URL: {}", e)))?;
        let secret = secret.ok_or_else(|| ConfigError::MissingVar("CLUSTER_API_SECRET".to_string()))?;
        let timeout_secs = match timeout {
            Some(t) => t.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("CLUSTER_API_TIMEOUT_SECS must be a number, got '{}'", t))
            })?,
            None => 10,
        };

        Ok(ClusterApiConfig {
            url,
            secret,
            timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, Ipv4Addr::new(0, 0, 0, 0));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_database_url_validation() {
        assert!(Settings::parse_database_url("postgresql://u:p@db:5432/flow").is_ok());
        assert!(Settings::parse_database_url("mysql://u:p@db/flow").is_err());
        assert!(Settings::parse_database_url("not a url").is_err());
    }

    #[test]
    fn test_cluster_api_requires_secret() {
        let missing = Settings::parse_cluster_api("http://cluster-api:9343", None, None);
        assert!(matches!(missing, Err(ConfigError::MissingVar(_))));

        let config =
            Settings::parse_cluster_api("http://cluster-api:9343", Some("s".into()), None).unwrap();
        assert_eq!(config.timeout_secs, 10);

        let bad_timeout =
            Settings::parse_cluster_api("http://cluster-api:9343", Some("s".into()), Some("soon".into()));
        assert!(matches!(bad_timeout, Err(ConfigError::InvalidValue(_))));
    }
}
