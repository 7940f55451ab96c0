//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check bind addresses parse
//! - Check redirect patterns compile and targets stay on this site
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::http::redirect::is_internal_path;
use crate::routing::pattern::Pattern;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid {field} {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("redirect {index}: {source}")]
    RedirectPattern {
        index: usize,
        #[source]
        source: crate::error::PatternError,
    },

    #[error("redirect {index}: target {target:?} is not an internal path")]
    RedirectTarget { index: usize, target: String },

    #[error("redirect {index}: status {status} is not a 3xx code")]
    RedirectStatus { index: usize, status: u16 },

    #[error("listener.request_timeout_secs must be greater than zero")]
    ZeroTimeout,
}

/// Check a parsed config for semantic problems.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    for (index, redirect) in config.redirects.iter().enumerate() {
        if let Err(source) = Pattern::compile(&redirect.pattern) {
            errors.push(ValidationError::RedirectPattern { index, source });
        }
        if !is_internal_path(&redirect.target) {
            errors.push(ValidationError::RedirectTarget {
                index,
                target: redirect.target.clone(),
            });
        }
        if !(300..400).contains(&redirect.status) {
            errors.push(ValidationError::RedirectStatus {
                index,
                status: redirect.status,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
