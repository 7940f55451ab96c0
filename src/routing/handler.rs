//! Handler signatures shared by routes, filters and the fallback.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::RouterError;
use crate::http::Context;

/// Outcome of a handler or filter. An error aborts the pipeline.
pub type HandlerResult = Result<(), RouterError>;

/// An async request handler borrowing the per-request context.
pub type Handler = Arc<dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync>;

/// Renders an error into the context's response.
pub type ErrorHandler = Arc<dyn Fn(&mut Context, RouterError) + Send + Sync>;

/// Box an async closure as a [`Handler`].
///
/// ```ignore
/// let h = handler(|ctx| Box::pin(async move {
///     ctx.text("hello");
///     Ok(())
/// }));
/// ```
pub fn handler<F>(f: F) -> Handler
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Lift a synchronous function into a [`Handler`].
pub fn sync_handler<F>(f: F) -> Handler
where
    F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
{
    handler(move |ctx| {
        let result = f(ctx);
        Box::pin(async move { result })
    })
}
