//! Static file fallback, run when no route handles a request.
//!
//! # Design Decisions
//! - Files resolve under a single local root; the canonical path cannot
//!   climb out of it
//! - Missing files are NotFound, any other stat failure is NotAuthorized
//! - Directories serve their `index.html`
//! - Streaming, ranges and conditional requests are left to tower-http

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::Request;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::RouterError;
use crate::http::Context;
use crate::routing::handler::{handler, Handler, HandlerResult};

/// Root used when the config does not name one.
pub const DEFAULT_PUBLIC_DIR: &str = "./public";

/// File fallback serving from the config's `public_dir`.
pub fn default_file_handler() -> Handler {
    handler(|ctx| {
        Box::pin(async move {
            let root = match ctx.config("public_dir") {
                dir if dir.is_empty() => PathBuf::from(DEFAULT_PUBLIC_DIR),
                dir => PathBuf::from(dir),
            };
            serve_file(ctx, &root).await
        })
    })
}

/// File fallback serving from a fixed root.
pub fn file_handler(root: impl Into<PathBuf>) -> Handler {
    let root = root.into();
    handler(move |ctx| {
        let root = root.clone();
        Box::pin(async move { serve_file(ctx, &root).await })
    })
}

/// Serve the file at the context path under `root`.
pub async fn serve_file(ctx: &mut Context, root: &Path) -> HandlerResult {
    let mut local = root.join(ctx.path().trim_start_matches('/'));

    let metadata = stat(ctx.path(), &local).await?;
    if metadata.is_dir() {
        local.push("index.html");
        let index = stat(ctx.path(), &local).await?;
        if index.is_dir() {
            return Err(RouterError::NotFound {
                path: ctx.path().to_string(),
            });
        }
    }

    let mut request = Request::new(Body::empty());
    *request.method_mut() = ctx.method().clone();
    *request.uri_mut() = ctx.uri().clone();
    *request.headers_mut() = ctx.headers().clone();

    let response = match ServeFile::new(&local).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    tracing::trace!(file = ?local, status = response.status().as_u16(), "Served file");
    ctx.set_response(response.map(Body::new));
    Ok(())
}

async fn stat(path: &str, local: &Path) -> Result<std::fs::Metadata, RouterError> {
    tokio::fs::metadata(local).await.map_err(|source| match source.kind() {
        ErrorKind::NotFound => RouterError::NotFound {
            path: path.to_string(),
        },
        _ => RouterError::NotAuthorized {
            path: path.to_string(),
            source,
        },
    })
}
