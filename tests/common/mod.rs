//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;

use context_router::config::{ListenerConfig, RouterConfig};
use context_router::{Router, Shutdown};

/// A development-mode config serving files from `public_dir`.
pub fn config_with_public_dir(public_dir: &Path) -> RouterConfig {
    let mut config = RouterConfig::default();
    config.server.public_dir = public_dir.to_string_lossy().into_owned();
    config
}

/// Serve `router` on an ephemeral port until the returned [`Shutdown`] fires.
pub async fn spawn_server(router: Arc<Router>) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let signal = shutdown.wait();

    tokio::spawn(async move {
        let config = ListenerConfig::default();
        let _ = context_router::http::serve(router, listener, &config, signal).await;
    });

    (addr, shutdown)
}

/// A client that reports redirects instead of following them.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
