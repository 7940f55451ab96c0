//! Request inspection helpers.
//!
//! # Responsibilities
//! - Decode and canonicalize the request path
//! - Resolve the request ID and client address
//! - Decode urlencoded query strings and form bodies
//!
//! # Design Decisions
//! - Paths are decoded before canonicalizing, so an encoded `..` is
//!   collapsed too
//! - Canonical paths are always rooted; `..` never climbs above `/`
//! - Client address prefers `X-Real-IP`, then `X-Forwarded-For`, then the socket

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{header, request::Parts, Method};
use percent_encoding::percent_decode_str;
use uuid::Uuid;

use crate::params::Params;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Percent-decode a request path. Invalid UTF-8 sequences become U+FFFD.
pub fn decode_path(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}

/// Collapse `.`, `..` and repeated separators. The result always starts
/// with `/` and has no trailing separator unless it is the root.
pub fn canonical_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut canonical = String::with_capacity(path.len() + 1);
    for segment in &segments {
        canonical.push('/');
        canonical.push_str(segment);
    }
    if canonical.is_empty() {
        canonical.push('/');
    }
    canonical
}

/// The request ID header if present, otherwise a fresh UUID.
pub fn request_id(parts: &Parts) -> String {
    parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Best guess at the client address.
pub fn remote_addr(parts: &Parts) -> String {
    for name in ["x-real-ip", "x-forwarded-for"] {
        if let Some(value) = parts.headers.get(name).and_then(|v| v.to_str().ok()) {
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Whether the request carries a urlencoded form body worth parsing.
pub fn has_form_body(parts: &Parts) -> bool {
    let body_method = matches!(parts.method, Method::POST | Method::PUT | Method::PATCH);
    let urlencoded = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);
    body_method && urlencoded
}

/// Append the pairs of a urlencoded string to `params`.
pub fn decode_form(input: &[u8], params: &mut Params) {
    for (k, v) in url::form_urlencoded::parse(input) {
        params.add(k.into_owned(), v.into_owned());
    }
}
