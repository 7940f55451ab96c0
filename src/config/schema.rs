//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the router process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Request handling settings.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Free-form values exposed to handlers through `Config::lookup`.
    pub settings: HashMap<String, String>,

    /// Redirect routes registered at startup.
    pub redirects: Vec<RedirectConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest request body read when parsing form params.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

/// Request handling settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Hide error detail from clients.
    pub production: bool,

    /// Root directory for the static file fallback.
    pub public_dir: String,

    /// Paths under this prefix bypass the route table.
    pub asset_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            production: false,
            public_dir: "./public".to_string(),
            asset_prefix: "/assets".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "context_router=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A redirect route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedirectConfig {
    /// Route pattern to match.
    pub pattern: String,

    /// Internal path to redirect to.
    pub target: String,

    /// Redirect status (default: 301).
    #[serde(default = "default_redirect_status")]
    pub status: u16,
}

fn default_redirect_status() -> u16 {
    301
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: RouterConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.server.asset_prefix, "/assets");
        assert!(!config.server.production);
        assert!(config.redirects.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config: RouterConfig = toml::from_str(
            r#"
            [server]
            production = true
            public_dir = "/srv/www"

            [observability]
            log_format = "json"

            [settings]
            site_name = "Example"

            [[redirects]]
            pattern = "/old/{id:[0-9]+}"
            target = "/new"
            "#,
        )
        .unwrap();
        assert!(config.server.production);
        assert_eq!(config.server.public_dir, "/srv/www");
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.settings["site_name"], "Example");
        assert_eq!(config.redirects[0].status, 301);
    }
}
