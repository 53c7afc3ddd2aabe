//! Server configuration from TOML or environment

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Default host address
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port number
pub const DEFAULT_PORT: u16 = 8000;

/// Default CORS origins (local form page during development)
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:8000",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:8000",
];

/// Default history page size when the client sends no `limit`
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Server configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Allowed CORS origins
    pub cors_origins: Vec<String>,

    /// Path to SQLite database
    pub db_path: PathBuf,

    /// Linear model artifact; the BMI reference classifier runs without one
    pub model_path: Option<PathBuf>,

    /// History page size when none is requested
    pub default_history_limit: usize,

    /// Enable request logging
    pub enable_logging: bool,

    /// Log level for tracing
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            db_path: Self::default_db_path(),
            model_path: None,
            default_history_limit: DEFAULT_HISTORY_LIMIT,
            enable_logging: true,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Default database path, under the user data directory when one exists
    fn default_db_path() -> PathBuf {
        dirs::data_local_dir()
            .map(|dir| dir.join("obesitrack").join("obesitrack.db"))
            .unwrap_or_else(|| PathBuf::from("obesitrack.db"))
    }

    /// Load config from environment variables with fallback to defaults
    ///
    /// Environment variables:
    /// - `OBESITRACK_HOST` - Server host
    /// - `OBESITRACK_PORT` - Server port
    /// - `OBESITRACK_DB_PATH` - Database path
    /// - `OBESITRACK_MODEL_PATH` - Linear model artifact
    /// - `OBESITRACK_LOG_LEVEL` - Log level (trace, debug, info, warn, error)
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Load an optional TOML file, then apply environment overrides
    ///
    /// Missing keys in the file keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::from_env());
        };

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("OBESITRACK_HOST") {
            self.host = host;
        }

        if let Some(port) = lookup("OBESITRACK_PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.port = port;
        }

        if let Some(db_path) = lookup("OBESITRACK_DB_PATH") {
            self.db_path = PathBuf::from(db_path);
        }

        if let Some(model_path) = lookup("OBESITRACK_MODEL_PATH") {
            self.model_path = Some(PathBuf::from(model_path));
        }

        if let Some(log_level) = lookup("OBESITRACK_LOG_LEVEL") {
            self.log_level = log_level;
        }
    }

    /// Get the socket address for the server
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| format!("Invalid address: {}", e))
    }

    /// Get the full server URL
    #[must_use]
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be zero".to_string());
        }

        if self.host.is_empty() {
            return Err("Host cannot be empty".to_string());
        }

        if self.db_path.as_os_str().is_empty() {
            return Err("Database path cannot be empty".to_string());
        }

        if self.default_history_limit == 0
            || self.default_history_limit > crate::storage::MAX_HISTORY_LIMIT
        {
            return Err(format!(
                "Default history limit must be between 1 and {}",
                crate::storage::MAX_HISTORY_LIMIT
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.log_level
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(!config.cors_origins.is_empty());
        assert!(config.db_path.ends_with("obesitrack.db"));
        assert!(config.model_path.is_none());
        assert_eq!(config.default_history_limit, 10);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("OBESITRACK_HOST", "0.0.0.0"),
            ("OBESITRACK_PORT", "8080"),
            ("OBESITRACK_DB_PATH", "/tmp/test.db"),
            ("OBESITRACK_MODEL_PATH", "/tmp/model.json"),
            ("OBESITRACK_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.db_path, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.model_path, Some(PathBuf::from("/tmp/model.json")));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_unparsable_port_is_ignored() {
        let mut config = ServerConfig::default();
        config.apply_env(|key| (key == "OBESITRACK_PORT").then(|| "http".to_string()));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = 9100\ndb_path = \"history.db\"").unwrap();

        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.db_path, PathBuf::from("history.db"));
        assert_eq!(config.default_history_limit, DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn test_load_without_file_matches_environment() {
        assert_eq!(ServerConfig::load(None).unwrap(), ServerConfig::from_env());
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();

        let err = ServerConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_socket_addr() {
        let config = ServerConfig::default();
        let addr = config.socket_addr().expect("Default socket address should be valid");
        assert_eq!(addr.ip(), std::net::Ipv4Addr::new(127, 0, 0, 1));
        assert_eq!(addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_config_server_url() {
        let config = ServerConfig {
            host: "localhost".to_string(),
            port: 3000,
            ..Default::default()
        };
        assert_eq!(config.server_url(), "http://localhost:3000");
    }

    #[test]
    fn test_config_validate() {
        assert!(ServerConfig::default().validate().is_ok());

        let zero_port = ServerConfig {
            port: 0,
            ..Default::default()
        };
        assert!(zero_port.validate().is_err());

        let empty_host = ServerConfig {
            host: String::new(),
            ..Default::default()
        };
        assert!(empty_host.validate().is_err());

        let bad_level = ServerConfig {
            log_level: "invalid".to_string(),
            ..Default::default()
        };
        assert!(bad_level.validate().is_err());

        let bad_limit = ServerConfig {
            default_history_limit: 51,
            ..Default::default()
        };
        assert!(bad_limit.validate().is_err());
    }
}
