//! Error taxonomy for the router.
//!
//! # Design Decisions
//! - `PatternError` is raised at registration and never reaches a request
//! - Every other failure is a `RouterError`, which maps onto an HTTP status,
//!   a public title and a public message for the error handler
//! - Errors without a natural status render as a generic 500

use std::panic::Location;

use axum::http::StatusCode;
use thiserror::Error;

/// A malformed route pattern.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("unbalanced braces in route pattern {pattern:?}")]
    UnbalancedBraces { pattern: String },

    #[error("missing name or regex in placeholder {placeholder:?} of route pattern {pattern:?}")]
    MissingSeparator { pattern: String, placeholder: String },

    #[error("invalid regex for route pattern {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("route pattern {pattern:?} declares {params} params but compiles to {groups} capture groups")]
    CaptureCount {
        pattern: String,
        params: usize,
        groups: usize,
    },

    #[error("no value for param {name:?} when expanding route pattern {pattern:?}")]
    MissingValue { pattern: String, name: String },
}

/// An error carrying an explicit HTTP status and user-facing text.
#[derive(Debug, Error)]
#[error("{title} ({status}): {message}")]
pub struct StatusError {
    pub status: StatusCode,
    pub title: String,
    pub message: String,
    location: &'static Location<'static>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StatusError {
    #[track_caller]
    pub fn new(status: StatusCode, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            message: message.into(),
            location: Location::caller(),
            source: None,
        }
    }

    #[track_caller]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Bad Request", message)
    }

    #[track_caller]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden", message)
    }

    /// Attach the underlying cause.
    pub fn with_source(mut self, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Where the error was constructed, as `file:line`.
    pub fn file_line(&self) -> String {
        format!("{}:{}", self.location.file(), self.location.line())
    }
}

/// Errors produced while routing or handling a request.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// The request body or query string could not be parsed.
    #[error("failed to parse request params: {0}")]
    Parse(String),

    #[error("no file found for {path}")]
    NotFound { path: String },

    #[error("access to {path} denied: {source}")]
    NotAuthorized {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Status(#[from] StatusError),

    /// A redirect target was refused.
    #[error("ignoring redirect to external path {0}")]
    Redirect(String),

    #[error("status {0} is not a redirect status")]
    RedirectStatus(StatusCode),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl RouterError {
    /// Wrap any error returned from application code.
    pub fn other(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        RouterError::Other(err.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RouterError::Parse(_) => StatusCode::BAD_REQUEST,
            RouterError::NotFound { .. } => StatusCode::NOT_FOUND,
            RouterError::NotAuthorized { .. } => StatusCode::UNAUTHORIZED,
            RouterError::Status(e) => e.status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Title shown to clients.
    pub fn title(&self) -> &str {
        match self {
            RouterError::Parse(_) => "Bad Request",
            RouterError::NotFound { .. } => "Not Found",
            RouterError::NotAuthorized { .. } => "Not Authorized",
            RouterError::Status(e) => &e.title,
            _ => "Server Error",
        }
    }

    /// Message shown to clients. Never includes internal detail.
    pub fn public_message(&self) -> &str {
        match self {
            RouterError::Parse(_) => "Sorry, the request could not be understood.",
            RouterError::NotFound { .. } => "Sorry, the page you requested could not be found.",
            RouterError::NotAuthorized { .. } => "Sorry, you are not allowed to access this page.",
            RouterError::Status(e) => &e.message,
            _ => "Sorry, something went wrong.",
        }
    }

    /// Construction site, when the error recorded one.
    pub fn file_line(&self) -> Option<String> {
        match self {
            RouterError::Status(e) => Some(e.file_line()),
            _ => None,
        }
    }
}
