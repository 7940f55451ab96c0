//! Centralized error rendering.
//!
//! Every error returned by a filter, handler or the file fallback ends up
//! here. Production mode shows only the public title and message; otherwise
//! the status, call site and error text are appended.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderValue, Response};

use crate::error::RouterError;
use crate::http::Context;
use crate::routing::handler::ErrorHandler;

/// The default [`ErrorHandler`].
pub fn default_error_handler() -> ErrorHandler {
    Arc::new(render_error)
}

/// Replace the context's response with an HTML error page.
pub fn render_error(ctx: &mut Context, err: RouterError) {
    let status = err.status_code();
    let mut html = format!(
        "<h1>{}</h1><p>{}</p>",
        escape_html(err.title()),
        escape_html(err.public_message())
    );

    if !ctx.production() {
        let at = err.file_line().unwrap_or_else(|| "unknown".to_string());
        html.push_str(&format!(
            "<p>Error {} at {}</p><p><code>Error: {}</code></p>",
            status.as_u16(),
            escape_html(&at),
            escape_html(&err.to_string())
        ));
    }

    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), error = %err, "Request failed");
    } else {
        tracing::warn!(status = status.as_u16(), error = %err, "Request failed");
    }

    let mut response = Response::new(Body::from(html));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    ctx.set_response(response);
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
