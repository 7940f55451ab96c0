//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! router.rs dispatch:
//!     → request span (id, method, path) around every pipeline
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms, gauges)
//! ```

pub mod logging;
pub mod metrics;
