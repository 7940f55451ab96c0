//! HTTP request handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum + tower-http layers, RouterService)
//!     → request.rs (decoded canonical path, request ID, client address)
//!     → context.rs (per-request context given to filters and handlers)
//!     → multipart.rs (uploaded files, read on demand)
//!     → redirect.rs / files.rs (redirects, static file fallback)
//!     → errors.rs (render any error into the response)
//!     → Send to client
//! ```

pub mod context;
pub mod errors;
pub mod files;
pub mod multipart;
pub mod redirect;
pub mod request;
pub mod server;

pub use context::Context;
pub use errors::{default_error_handler, render_error};
pub use files::{default_file_handler, file_handler, serve_file};
pub use multipart::FilePart;
pub use redirect::is_internal_path;
pub use request::{canonical_path, decode_path, X_REQUEST_ID};
pub use server::{build_app, serve, RouterService};
