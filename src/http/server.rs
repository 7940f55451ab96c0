//! HTTP server setup.
//!
//! # Responsibilities
//! - Adapt a [`Router`] to a tower `Service`
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve on a caller-provided listener with graceful shutdown
//!
//! # Design Decisions
//! - Building the router never registers it anywhere; serving is explicit
//! - The router is the axum fallback service, so it sees every request

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use tokio::net::TcpListener;
use tower::Service;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ListenerConfig;
use crate::routing::Router;

/// A cloneable tower service dispatching through a shared [`Router`].
#[derive(Clone)]
pub struct RouterService {
    router: Arc<Router>,
}

impl RouterService {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }
}

impl Service<Request<Body>> for RouterService {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let router = self.router.clone();
        Box::pin(async move { Ok(router.dispatch(request).await) })
    }
}

impl Router {
    /// Wrap a shared router as a tower `Service`.
    pub fn into_service(self: Arc<Self>) -> RouterService {
        RouterService::new(self)
    }
}

/// Build the axum application with all middleware layers.
#[allow(deprecated)]
pub fn build_app(router: Arc<Router>, config: &ListenerConfig) -> axum::Router {
    axum::Router::new()
        .fallback_service(router.into_service())
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(
    router: Arc<Router>,
    listener: TcpListener,
    config: &ListenerConfig,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, routes = router.route_count(), "HTTP server starting");

    let app = build_app(router, config).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
