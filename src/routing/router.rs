//! Route table and request dispatch.
//!
//! # Responsibilities
//! - Store routes and filters in registration order
//! - Look up the first route matching a method and path
//! - Run the per-request pipeline: filters, handler or file fallback, errors
//!
//! # Design Decisions
//! - Linear first-match scan; registration order is the only priority
//! - Routes and filters sit behind a reader/writer lock; a lookup scans a
//!   consistent table and never interleaves with a registration
//! - Lock guards are released before any handler runs
//! - Redirect routes skip filters and handlers entirely
//! - Absence of a route falls through to file serving, never to the
//!   error handler directly

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use axum::body::Body;
use axum::http::{HeaderValue, Request, Response, StatusCode};
use futures_util::future::BoxFuture;
use tracing::Instrument;

use crate::config::Config;
use crate::error::{PatternError, RouterError};
use crate::http::errors::default_error_handler;
use crate::http::files::default_file_handler;
use crate::http::redirect::{is_internal_path, redirect_response};
use crate::http::request::{canonical_path, decode_path, remote_addr, request_id, X_REQUEST_ID};
use crate::http::Context;
use crate::observability::metrics;
use crate::routing::handler::{sync_handler, ErrorHandler, Handler, HandlerResult};
use crate::routing::matcher::DEFAULT_ASSET_PREFIX;
use crate::routing::route::{RedirectTarget, Route, RouteHandle};

/// Paths whose requests are logged at trace level only.
const QUIET_PREFIXES: &[&str] = &["/files"];

#[derive(Default)]
struct RouteTable {
    routes: Vec<Arc<Route>>,
    filters: Vec<Handler>,
}

/// The route table plus the collaborators used while dispatching.
pub struct Router {
    table: RwLock<RouteTable>,
    file_handler: Handler,
    error_handler: ErrorHandler,
    config: Arc<dyn Config>,
}

impl Router {
    /// Create an empty router using the default file and error handlers.
    pub fn new(config: Arc<dyn Config>) -> Self {
        Self {
            table: RwLock::new(RouteTable::default()),
            file_handler: default_file_handler(),
            error_handler: default_error_handler(),
            config,
        }
    }

    /// Replace the fallback run when no route handles a request.
    pub fn with_file_handler(mut self, handler: Handler) -> Self {
        self.file_handler = handler;
        self
    }

    /// Replace the error renderer.
    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = handler;
        self
    }

    pub fn config(&self) -> &Arc<dyn Config> {
        &self.config
    }

    /// Register an async handler for `pattern`, accepting GET by default.
    ///
    /// A malformed pattern is logged and the route is not added.
    pub fn register<F>(&self, pattern: &str, handler: F) -> Result<RouteHandle, RouterError>
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.register_handler(pattern, Arc::new(handler))
    }

    /// Register a prepared [`Handler`] for `pattern`.
    pub fn register_handler(&self, pattern: &str, handler: Handler) -> Result<RouteHandle, RouterError> {
        let route = Route::new(pattern, handler).inspect_err(|e| log_pattern_error(pattern, e))?;
        Ok(self.push_route(route))
    }

    /// Register a route that redirects to `target` and does nothing else.
    ///
    /// `target` must be an internal path and `status` a 3xx code.
    pub fn register_redirect(
        &self,
        pattern: &str,
        target: &str,
        status: StatusCode,
    ) -> Result<RouteHandle, RouterError> {
        if !is_internal_path(target) {
            tracing::error!(pattern = %pattern, target = %target, "Refusing redirect route to external target");
            return Err(RouterError::Redirect(target.to_string()));
        }
        if !status.is_redirection() {
            tracing::error!(pattern = %pattern, status = status.as_u16(), "Refusing redirect route with non-3xx status");
            return Err(RouterError::RedirectStatus(status));
        }

        let target = RedirectTarget {
            path: target.to_string(),
            status,
        };
        let route = Route::redirect_to(pattern, target).inspect_err(|e| log_pattern_error(pattern, e))?;
        Ok(self.push_route(route))
    }

    /// Append an async filter, run before every request's handler.
    pub fn add_filter<F>(&self, filter: F)
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.add_filter_handler(Arc::new(filter));
    }

    /// Append a synchronous filter.
    pub fn add_filter_fn<F>(&self, filter: F)
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.add_filter_handler(sync_handler(filter));
    }

    pub fn add_filter_handler(&self, filter: Handler) {
        self.write_table().filters.push(filter);
    }

    /// First route accepting `method` and `path`, in registration order.
    pub fn lookup(&self, method: &str, path: &str) -> Option<Arc<Route>> {
        let asset_prefix = self.asset_prefix();
        self.read_table()
            .routes
            .iter()
            .find(|route| route.match_method(method) && route.match_path(path, &asset_prefix))
            .cloned()
    }

    /// Registered routes as `"[METHODS] pattern"`.
    pub fn routes(&self) -> Vec<String> {
        self.read_table().routes.iter().map(|r| r.to_string()).collect()
    }

    pub fn route_count(&self) -> usize {
        self.read_table().routes.len()
    }

    /// Handle one request. Errors are rendered into the returned response.
    pub async fn dispatch(&self, request: Request<Body>) -> Response<Body> {
        let (mut parts, body) = request.into_parts();
        let path = canonical_path(&decode_path(parts.uri.path()));
        let id = request_id(&parts);
        if let Ok(value) = HeaderValue::from_str(&id) {
            parts.headers.insert(X_REQUEST_ID, value);
        }
        let span = tracing::info_span!(
            "request",
            id = %id,
            method = %parts.method,
            path = %path,
        );

        async move {
            let started = Instant::now();
            let method = parts.method.clone();
            let quiet = self.is_quiet(&path);
            if quiet {
                tracing::trace!(client = %remote_addr(&parts), "Started request");
            } else {
                tracing::info!(client = %remote_addr(&parts), "Started request");
            }

            let route = self.lookup(method.as_str(), &path);
            let route_label = route
                .as_ref()
                .map(|r| r.pattern().as_str().to_string())
                .unwrap_or_else(|| "static".to_string());
            if let Some(route) = &route {
                if !quiet {
                    tracing::info!(route = %route, "Handling with route");
                }
            }

            let redirect = route.as_ref().and_then(|r| r.redirect().cloned());
            let response = match redirect.map(|target| redirect_response(&target.path, target.status)) {
                Some(Ok(response)) => response,
                Some(Err(e)) => {
                    let mut ctx = Context::new(parts, body, path, route, id, self.config.clone());
                    (self.error_handler)(&mut ctx, e);
                    ctx.into_response()
                }
                None => {
                    let handler = route.as_ref().and_then(|r| r.handler().cloned());
                    let mut ctx = Context::new(parts, body, path, route, id, self.config.clone());
                    self.run_pipeline(&mut ctx, handler).await;
                    ctx.into_response()
                }
            };

            let status = response.status().as_u16();
            if quiet {
                tracing::trace!(status, elapsed = ?started.elapsed(), "Finished request");
            } else {
                tracing::info!(status, elapsed = ?started.elapsed(), "Finished request");
            }
            metrics::record_request(method.as_str(), status, &route_label, started);
            response
        }
        .instrument(span)
        .await
    }

    /// Filters in order, then the handler or the file fallback. The first
    /// error goes to the error handler and ends the pipeline.
    async fn run_pipeline(&self, ctx: &mut Context, handler: Option<Handler>) {
        let filters = self.read_table().filters.clone();
        for filter in filters {
            if let Err(e) = filter(ctx).await {
                (self.error_handler)(ctx, e);
                return;
            }
        }

        let result = match handler {
            Some(handler) => handler(ctx).await,
            None => (self.file_handler)(ctx).await,
        };
        if let Err(e) = result {
            (self.error_handler)(ctx, e);
        }
    }

    fn push_route(&self, route: Route) -> RouteHandle {
        let route = Arc::new(route);
        let count = {
            let mut table = self.write_table();
            table.routes.push(route.clone());
            table.routes.len()
        };
        tracing::debug!(route = %route, "Registered route");
        metrics::record_route_count(count);
        RouteHandle::new(route)
    }

    fn asset_prefix(&self) -> String {
        let prefix = self.config.lookup("asset_prefix");
        if prefix.is_empty() {
            DEFAULT_ASSET_PREFIX.to_string()
        } else {
            prefix
        }
    }

    fn is_quiet(&self, path: &str) -> bool {
        path.starts_with(&self.asset_prefix()) || QUIET_PREFIXES.iter().any(|p| path.starts_with(p))
    }

    fn read_table(&self) -> std::sync::RwLockReadGuard<'_, RouteTable> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_table(&self) -> std::sync::RwLockWriteGuard<'_, RouteTable> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn log_pattern_error(pattern: &str, err: &PatternError) {
    tracing::error!(pattern = %pattern, error = %err, "Failed to compile route, route not added");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;
    use crate::error::StatusError;
    use axum::http::{header, Method};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn router() -> Router {
        Router::new(Arc::new(RouterConfig::default()))
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let r = router();
        r.register("/users/{id:[0-9]+}", |ctx| Box::pin(async move { ctx.text("numeric"); Ok(()) }))
            .unwrap();
        r.register("/users/me", |ctx| Box::pin(async move { ctx.text("me"); Ok(()) }))
            .unwrap();
        r.register("/users/{name:[a-z]+}", |ctx| Box::pin(async move { ctx.text("name"); Ok(()) }))
            .unwrap();

        let route = r.lookup("GET", "/users/me").unwrap();
        assert_eq!(route.pattern().as_str(), "/users/me");
        let route = r.lookup("GET", "/users/42").unwrap();
        assert_eq!(route.pattern().as_str(), "/users/{id:[0-9]+}");
        let route = r.lookup("GET", "/users/bob").unwrap();
        assert_eq!(route.pattern().as_str(), "/users/{name:[a-z]+}");
    }

    #[test]
    fn test_earlier_general_route_shadows_later_specific() {
        let r = router();
        r.register_handler("/users/{any:.+}", sync_handler(|_| Ok(()))).unwrap();
        r.register_handler("/users/me", sync_handler(|_| Ok(()))).unwrap();
        let route = r.lookup("GET", "/users/me").unwrap();
        assert_eq!(route.pattern().as_str(), "/users/{any:.+}");
    }

    #[test]
    fn test_lookup_checks_method() {
        let r = router();
        r.register_handler("/items", sync_handler(|_| Ok(()))).unwrap().post();
        r.register_handler("/items", sync_handler(|_| Ok(()))).unwrap();

        let post = r.lookup("POST", "/items").unwrap();
        assert!(post.match_method("POST"));
        let get = r.lookup("", "/items").unwrap();
        assert!(get.match_method("GET"));
        assert!(r.lookup("DELETE", "/items").is_none());
    }

    #[test]
    fn test_bad_pattern_not_added() {
        let r = router();
        let err = r.register_handler("/a/{id/b", sync_handler(|_| Ok(()))).unwrap_err();
        assert!(matches!(err, RouterError::Pattern(PatternError::UnbalancedBraces { .. })));
        assert_eq!(r.route_count(), 0);
    }

    #[test]
    fn test_assets_never_match_routes() {
        let r = router();
        r.register_handler("/{path:.*}", sync_handler(|_| Ok(()))).unwrap();
        assert!(r.lookup("GET", "/assets/site.css").is_none());
        assert!(r.lookup("GET", "/site.css").is_some());
    }

    #[test]
    fn test_routes_listing() {
        let r = router();
        r.register_handler("/a", sync_handler(|_| Ok(()))).unwrap().accept(Method::POST);
        r.register_redirect("/b", "/a", StatusCode::MOVED_PERMANENTLY).unwrap();
        assert_eq!(r.routes(), vec!["[GET, POST] /a", "[GET] /b"]);
    }

    #[tokio::test]
    async fn test_dispatch_runs_handler_with_params() {
        let r = router();
        r.register("/tags/{id:[0-9]+}/destroy", |ctx| {
            Box::pin(async move {
                let id = ctx.param_int("id").await;
                ctx.text(format!("destroyed {id}"));
                Ok(())
            })
        })
        .unwrap()
        .accept(Method::POST);

        let response = r
            .dispatch(Request::builder().method(Method::POST).uri("/tags/42/destroy").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "destroyed 42");
    }

    #[tokio::test]
    async fn test_dispatch_canonicalizes_path() {
        let r = router();
        r.register_handler("/a/b", sync_handler(|ctx| {
            ctx.text(ctx.path().to_string());
            Ok(())
        }))
        .unwrap();
        let response = r.dispatch(get("/a//./x/../b/")).await;
        assert_eq!(body_text(response).await, "/a/b");
    }

    #[tokio::test]
    async fn test_dispatch_decodes_route_params() {
        let r = router();
        r.register_handler("/q/{term:.+}", sync_handler(|ctx| {
            ctx.text(ctx.route_param("term").to_string());
            Ok(())
        }))
        .unwrap();
        r.register_handler("/tag/{name:[a-zé]+}", sync_handler(|ctx| {
            ctx.text(ctx.route_param("name").to_string());
            Ok(())
        }))
        .unwrap();

        let response = r.dispatch(get("/q/caf%C3%A9%20au%20lait")).await;
        assert_eq!(body_text(response).await, "café au lait");
        let response = r.dispatch(get("/tag/caf%C3%A9")).await;
        assert_eq!(body_text(response).await, "café");
    }

    #[tokio::test]
    async fn test_encoded_dot_segments_are_collapsed() {
        let r = router();
        r.register_handler("/etc/passwd", sync_handler(|ctx| {
            ctx.text(ctx.path().to_string());
            Ok(())
        }))
        .unwrap();
        let response = r.dispatch(get("/a/%2E%2E/%2e%2e/etc/passwd")).await;
        assert_eq!(body_text(response).await, "/etc/passwd");
    }

    #[tokio::test]
    async fn test_file_with_encoded_name_is_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello world.txt"), "spaced out").unwrap();
        let mut config = RouterConfig::default();
        config.server.public_dir = dir.path().to_string_lossy().into_owned();
        let r = Router::new(Arc::new(config));

        let response = r.dispatch(get("/hello%20world.txt")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "spaced out");
    }

    #[tokio::test]
    async fn test_invalid_request_id_header_is_replaced_once() {
        let r = router();
        r.register_handler("/id", sync_handler(|ctx| {
            let header = ctx.headers()[X_REQUEST_ID].to_str().unwrap().to_string();
            ctx.text(format!("{}|{}", ctx.request_id(), header));
            Ok(())
        }))
        .unwrap();

        let request = Request::builder()
            .uri("/id")
            .header(X_REQUEST_ID, HeaderValue::from_bytes(b"\xff\xfe").unwrap())
            .body(Body::empty())
            .unwrap();
        let body = body_text(r.dispatch(request).await).await;
        let (from_context, from_header) = body.split_once('|').unwrap();
        assert!(!from_context.is_empty());
        assert_eq!(from_context, from_header);
    }

    #[tokio::test]
    async fn test_filters_run_in_order_before_handler() {
        let r = router();
        let log = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second"] {
            let log = log.clone();
            r.add_filter_fn(move |_| {
                log.lock().unwrap().push(name);
                Ok(())
            });
        }
        let handler_log = log.clone();
        r.register_handler("/", sync_handler(move |_| {
            handler_log.lock().unwrap().push("handler");
            Ok(())
        }))
        .unwrap();

        r.dispatch(get("/")).await;
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "handler"]);
    }

    #[tokio::test]
    async fn test_filter_error_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(None));

        let seen_by_handler = seen.clone();
        let r = router().with_error_handler(Arc::new(move |ctx: &mut Context, err: RouterError| {
            *seen_by_handler.lock().unwrap() = Some(err.to_string());
            ctx.set_status(err.status_code());
        }));
        r.add_filter_fn(|_| Err(StatusError::forbidden("blocked by filter").into()));
        let later_filter = calls.clone();
        r.add_filter_fn(move |_| {
            later_filter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let handler_calls = calls.clone();
        r.register_handler("/", sync_handler(move |_| {
            handler_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();

        let response = r.dispatch(get("/")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(seen.lock().unwrap().as_deref().unwrap().contains("blocked by filter"));
    }

    #[tokio::test]
    async fn test_handler_error_goes_to_error_handler() {
        let r = router();
        r.register_handler("/boom", sync_handler(|_| Err(RouterError::other("kaboom")))).unwrap();
        let response = r.dispatch(get("/boom")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("kaboom"));
    }

    #[tokio::test]
    async fn test_redirect_route_skips_filters() {
        let r = router();
        let filter_calls = Arc::new(AtomicUsize::new(0));
        let counter = filter_calls.clone();
        r.add_filter_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        r.register_redirect("/old/{id:[0-9]+}", "/new", StatusCode::MOVED_PERMANENTLY).unwrap();

        let response = r.dispatch(get("/old/3")).await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/new");
        assert_eq!(filter_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_redirect_registration_rejects_external_targets() {
        let r = router();
        for target in ["http://evil.example/x", "//evil.example", "/\\evil.example", "relative"] {
            assert!(matches!(
                r.register_redirect("/go", target, StatusCode::MOVED_PERMANENTLY),
                Err(RouterError::Redirect(_))
            ));
        }
        assert!(matches!(
            r.register_redirect("/go", "/home", StatusCode::OK),
            Err(RouterError::RedirectStatus(status)) if status == StatusCode::OK
        ));
        assert_eq!(r.route_count(), 0);
        assert!(r.lookup("GET", "/go").is_none());
    }

    #[tokio::test]
    async fn test_unmatched_request_uses_file_handler_after_filters() {
        let filter_calls = Arc::new(AtomicUsize::new(0));
        let counter = filter_calls.clone();
        let r = router().with_file_handler(sync_handler(|ctx| {
            ctx.text(format!("file {}", ctx.path()));
            Ok(())
        }));
        r.add_filter_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let response = r.dispatch(get("/robots.txt")).await;
        assert_eq!(body_text(response).await, "file /robots.txt");
        assert_eq!(filter_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_file_renders_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RouterConfig::default();
        config.server.public_dir = dir.path().to_string_lossy().into_owned();
        let r = Router::new(Arc::new(config));

        let response = r.dispatch(get("/missing.html")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_concurrent_requests_on_same_route_keep_own_params() {
        let r = Arc::new(router());
        r.register("/echo/{n:[0-9]+}", |ctx| {
            Box::pin(async move {
                let n = ctx.route_param("n").to_string();
                tokio::task::yield_now().await;
                ctx.text(n);
                Ok(())
            })
        })
        .unwrap();

        let mut tasks = Vec::new();
        for i in 0..50 {
            let r = r.clone();
            tasks.push(tokio::spawn(async move {
                let response = r.dispatch(get(&format!("/echo/{i}"))).await;
                (i, body_text(response).await)
            }));
        }
        for task in tasks {
            let (i, body) = task.await.unwrap();
            assert_eq!(body, i.to_string());
        }
    }

    #[tokio::test]
    async fn test_registration_while_serving() {
        let r = Arc::new(router());
        r.register_handler("/ping", sync_handler(|ctx| {
            ctx.text("pong");
            Ok(())
        }))
        .unwrap();

        let writer = {
            let r = r.clone();
            tokio::spawn(async move {
                for i in 0..100 {
                    r.register_handler(&format!("/extra/{i}"), sync_handler(|_| Ok(()))).unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };
        for _ in 0..100 {
            let response = r.dispatch(get("/ping")).await;
            assert_eq!(body_text(response).await, "pong");
        }
        writer.await.unwrap();
        assert_eq!(r.route_count(), 101);
    }
}
