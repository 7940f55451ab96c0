//! Context router library.
//!
//! Maps `(method, path)` pairs to handlers using patterns with
//! `{name:regex}` placeholders, runs global filters before each handler,
//! serves static files when no route matches and renders every failure
//! through a single error handler.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod params;
pub mod routing;

pub use config::{Config, RouterConfig, SharedConfig};
pub use error::{PatternError, RouterError, StatusError};
pub use http::Context;
pub use lifecycle::Shutdown;
pub use params::Params;
pub use routing::{handler, sync_handler, Handler, HandlerResult, Route, RouteHandle, Router};
