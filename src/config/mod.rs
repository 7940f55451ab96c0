//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (validated, immutable)
//!     → SharedConfig (atomic snapshot read by every request)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → SharedConfig::store swaps the snapshot
//! ```
//!
//! # Design Decisions
//! - The router only sees the `Config` trait, never the schema
//! - All fields have defaults to allow minimal configs
//! - A reload that fails validation keeps the current snapshot

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

use std::sync::Arc;

use arc_swap::ArcSwap;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{ListenerConfig, LogFormat, ObservabilityConfig, RedirectConfig, RouterConfig, ServerConfig};

/// Server configuration as seen by the router and handlers.
pub trait Config: Send + Sync {
    /// True when error detail must be hidden from clients.
    fn production(&self) -> bool;

    /// Value for `key`, or `""` when unset.
    fn lookup(&self, key: &str) -> String;
}

impl Config for RouterConfig {
    fn production(&self) -> bool {
        self.server.production
    }

    fn lookup(&self, key: &str) -> String {
        match key {
            "public_dir" => self.server.public_dir.clone(),
            "asset_prefix" => self.server.asset_prefix.clone(),
            "bind_address" => self.listener.bind_address.clone(),
            "max_body_bytes" => self.listener.max_body_bytes.to_string(),
            _ => self.settings.get(key).cloned().unwrap_or_default(),
        }
    }
}

/// A `RouterConfig` that can be replaced while requests are in flight.
#[derive(Clone)]
pub struct SharedConfig {
    inner: Arc<ArcSwap<RouterConfig>>,
}

impl SharedConfig {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Current snapshot.
    pub fn load(&self) -> Arc<RouterConfig> {
        self.inner.load_full()
    }

    /// Publish a new snapshot.
    pub fn store(&self, config: RouterConfig) {
        self.inner.store(Arc::new(config));
    }
}

impl Config for SharedConfig {
    fn production(&self) -> bool {
        self.inner.load().production()
    }

    fn lookup(&self, key: &str) -> String {
        self.inner.load().lookup(key)
    }
}
