//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Registration (usually at startup):
//!     pattern string
//!     → pattern.rs (compile `{name:regex}` placeholders to an anchored regex)
//!     → route.rs (Route with methods and handler or redirect)
//!     → router.rs (append to the ordered route table)
//!
//! Incoming Request (method, canonical path):
//!     → router.rs (linear scan in registration order)
//!     → matcher.rs (method set, asset prefix, short prefix, pattern)
//!     → Return: first matching Route or None
//! ```
//!
//! # Design Decisions
//! - Deterministic: same input always matches same route
//! - First match wins; there is no specificity ranking
//! - Routes hold no per-request state

pub mod handler;
pub mod matcher;
pub mod pattern;
pub mod route;
pub mod router;

pub use handler::{handler, sync_handler, ErrorHandler, Handler, HandlerResult};
pub use pattern::Pattern;
pub use route::{RedirectTarget, Route, RouteHandle};
pub use router::Router;
