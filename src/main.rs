//! Context router server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http/server.rs (trace, timeout, request id)
//!                          │
//!                          ▼
//!                     routing/router.rs
//!                     canonical path → first matching route
//!                          │
//!             ┌────────────┼──────────────┐
//!             ▼            ▼              ▼
//!         redirect     filters →      filters →
//!         response     handler        file server
//!                          │
//!                          ▼ (any failure)
//!                     http/errors.rs
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use clap::Parser;
use tokio::net::TcpListener;

use context_router::config::watcher::ConfigWatcher;
use context_router::config::{load_config, RouterConfig, SharedConfig};
use context_router::lifecycle::{wait_for_signal, Shutdown};
use context_router::observability::{logging, metrics};
use context_router::{Context, Router, RouterError};

#[derive(Parser)]
#[command(name = "context-router")]
#[command(about = "HTTP router serving registered routes and static files", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Reload the configuration file when it changes.
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);
    tracing::info!("context-router v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        production = config.server.production,
        public_dir = %config.server.public_dir,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener_config = config.listener.clone();
    let redirects = config.redirects.clone();
    let shared = SharedConfig::new(config);

    // Dropping the watcher stops it, so it lives until main returns.
    let _watcher = match (&cli.config, cli.watch) {
        (Some(path), true) => Some(ConfigWatcher::new(path, shared.clone()).run()?),
        _ => None,
    };

    let router = Arc::new(Router::new(Arc::new(shared)));
    install_routes(&router);

    for redirect in &redirects {
        let status = StatusCode::from_u16(redirect.status).unwrap_or(StatusCode::MOVED_PERMANENTLY);
        if let Err(e) = router.register_redirect(&redirect.pattern, &redirect.target, status) {
            tracing::warn!(pattern = %redirect.pattern, error = %e, "Skipping configured redirect");
        }
    }

    for route in router.routes() {
        tracing::debug!(route = %route, "Route registered");
    }

    let listener = TcpListener::bind(&listener_config.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    context_router::http::serve(router, listener, &listener_config, shutdown.wait()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Built-in routes and filters.
fn install_routes(router: &Router) {
    router.add_filter_fn(reject_dotfiles);

    let health = router.register("/healthz", |ctx: &mut Context| {
        Box::pin(async move {
            ctx.text("ok");
            Ok(())
        })
    });
    if let Err(e) = health {
        tracing::error!(error = %e, "Failed to register health route");
    }
}

/// Hidden files are never served or routed.
fn reject_dotfiles(ctx: &mut Context) -> Result<(), RouterError> {
    if ctx.path().split('/').any(|segment| segment.starts_with('.')) {
        return Err(RouterError::NotFound {
            path: ctx.path().to_string(),
        });
    }
    Ok(())
}
