//! Redirect responses.
//!
//! Only site-internal paths are honored: they must start with a single `/`
//! and contain no `:` or `\`. Anything else is refused with an error and
//! leaves the response untouched.

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};

use crate::error::{RouterError, StatusError};
use crate::http::Context;

/// Whether `path` is safe to redirect to without leaving the site.
pub fn is_internal_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains(':') && !path.contains('\\')
}

/// A bare redirect response.
pub fn redirect_response(location: &str, status: StatusCode) -> Result<Response<Body>, RouterError> {
    let value = HeaderValue::from_str(location)
        .map_err(|_| StatusError::bad_request(format!("invalid redirect location {location:?}")))?;
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response.headers_mut().insert(header::LOCATION, value);
    Ok(response)
}

impl Context {
    /// Redirect to an internal path with 302 Found.
    pub fn redirect(&mut self, path: &str) -> Result<(), RouterError> {
        self.redirect_status(path, StatusCode::FOUND)
    }

    /// Redirect to an internal path with the given status.
    pub fn redirect_status(&mut self, path: &str, status: StatusCode) -> Result<(), RouterError> {
        if !is_internal_path(path) {
            return Err(RouterError::Redirect(path.to_string()));
        }
        tracing::info!(status = status.as_u16(), path = %path, "Redirecting");
        self.set_response(redirect_response(path, status)?);
        Ok(())
    }

    /// Redirect anywhere with 302 Found. The location is not checked.
    pub fn redirect_external(&mut self, url: &str) -> Result<(), RouterError> {
        self.set_response(redirect_response(url, StatusCode::FOUND)?);
        Ok(())
    }
}
