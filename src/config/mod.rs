/// Configuration management for the customerlake service
///
/// Handles server binding, platform database location, API mounting and logging.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// API mounting configuration
    pub api: ApiConfig,
    /// Log filter directive for tracing-subscriber (e.g., "info", "customerlake=debug")
    pub log_filter: String,
    /// Seed the demo customers and projects on startup
    pub seed_demo: bool,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Platform database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding the platform database (default: "data")
    /// Creates: {data_dir}/customerlake.db
    pub data_dir: String,
    /// Upper bound on pooled SQLite connections
    pub max_connections: u32,
}

/// API routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Prefix every REST route is nested under (default: "/api/rest")
    pub base_path: String,
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for k8s/container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env_or("CUSTOMERLAKE_HOST", "0.0.0.0"),
                port: env_or("CUSTOMERLAKE_PORT", "8080").parse().unwrap_or(8080),
            },
            database: DatabaseConfig {
                data_dir: env_or("CUSTOMERLAKE_DATA_DIR", "data"),
                max_connections: env_or("CUSTOMERLAKE_DB_MAX_CONNECTIONS", "5")
                    .parse()
                    .unwrap_or(5),
            },
            api: ApiConfig {
                base_path: env_or("CUSTOMERLAKE_BASE_PATH", "/api/rest"),
            },
            log_filter: env_or("CUSTOMERLAKE_LOG", "info"),
            seed_demo: parse_flag(&env_or("CUSTOMERLAKE_SEED_DEMO", "false")),
        }
    }
}

impl ApiConfig {
    /// Base path normalized to "/segment" form, or None when routes mount at the root
    pub fn normalized_base_path(&self) -> Option<String> {
        let trimmed = self.base_path.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(trimmed.to_string())
        } else {
            Some(format!("/{}", trimmed))
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
