//! Per-request context handed to filters and handlers.
//!
//! # Responsibilities
//! - Expose the request head, canonical path and matched route
//! - Merge form/query params with route params
//! - Hold the response being built
//! - Carry request-scoped data and the config collaborator
//!
//! # Design Decisions
//! - Route params are computed once from the shared route and owned here,
//!   so concurrent requests on the same route never share state
//! - The request body is read at most once; parsed form values are cached

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode, Uri};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::Span;

use crate::config::Config;
use crate::error::RouterError;
use crate::http::multipart::{has_multipart_body, parse_files, FilePart};
use crate::http::request::{decode_form, has_form_body, remote_addr};
use crate::params::Params;
use crate::routing::Route;

const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// The request context.
pub struct Context {
    parts: Parts,
    body: Option<Body>,
    form: Option<Result<Params, String>>,
    files: Option<Result<Vec<FilePart>, String>>,
    path: String,
    route: Option<Arc<Route>>,
    route_params: Params,
    response: Response<Body>,
    data: HashMap<String, Box<dyn Any + Send + Sync>>,
    config: Arc<dyn Config>,
    request_id: String,
    remote_addr: String,
    span: Span,
}

impl Context {
    /// Build a context for a request whose path has already been decoded and
    /// canonicalized.
    pub fn new(
        parts: Parts,
        body: Body,
        path: String,
        route: Option<Arc<Route>>,
        request_id: String,
        config: Arc<dyn Config>,
    ) -> Self {
        let route_params = route.as_ref().map(|r| r.parse(&path)).unwrap_or_default();
        let remote_addr = remote_addr(&parts);
        Self {
            parts,
            body: Some(body),
            form: None,
            files: None,
            path,
            route,
            route_params,
            response: Response::new(Body::empty()),
            data: HashMap::new(),
            config,
            request_id,
            remote_addr,
            span: Span::current(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn request_parts(&self) -> &Parts {
        &self.parts
    }

    /// The canonical request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    /// The span the context was created in; the request span during dispatch.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Params extracted from the path by the matched route.
    pub fn route_params(&self) -> &Params {
        &self.route_params
    }

    pub fn route_param(&self, key: &str) -> &str {
        self.route_params.get(key)
    }

    /// All params: form body and query values first, route values after.
    ///
    /// The body is parsed on the first call only. A parse failure is
    /// remembered and returned by every later call.
    pub async fn params(&mut self) -> Result<Params, RouterError> {
        if self.form.is_none() {
            let form = self.parse_request().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to parse request params");
                parse_message(e)
            });
            self.form = Some(form);
        }

        match &self.form {
            Some(Ok(form)) => {
                let mut params = form.clone();
                params.extend(self.route_params.clone());
                Ok(params)
            }
            Some(Err(message)) => Err(RouterError::Parse(message.clone())),
            None => Ok(self.route_params.clone()),
        }
    }

    /// Uploaded files sent under the form field `key`.
    ///
    /// The multipart body is read on the first call only. A request without
    /// a multipart body has no files.
    pub async fn param_files(&mut self, key: &str) -> Result<Vec<FilePart>, RouterError> {
        if self.files.is_none() {
            let files = if has_multipart_body(&self.parts) {
                let parsed = match self.body_bytes().await {
                    Ok(bytes) => parse_files(&self.parts, bytes).await,
                    Err(e) => Err(e),
                };
                parsed.map_err(|e| {
                    tracing::error!(error = %e, "Failed to parse multipart body");
                    parse_message(e)
                })
            } else {
                Ok(Vec::new())
            };
            self.files = Some(files);
        }

        match &self.files {
            Some(Ok(files)) => Ok(files.iter().filter(|f| f.name == key).cloned().collect()),
            Some(Err(message)) => Err(RouterError::Parse(message.clone())),
            None => Ok(Vec::new()),
        }
    }

    /// First value for `key` across all params, `""` on error or absence.
    pub async fn param(&mut self, key: &str) -> String {
        match self.params().await {
            Ok(params) => params.get(key).to_string(),
            Err(_) => String::new(),
        }
    }

    /// First value for `key` as a lenient integer, 0 on error or absence.
    pub async fn param_int(&mut self, key: &str) -> i64 {
        match self.params().await {
            Ok(params) => params.get_int(key),
            Err(_) => 0,
        }
    }

    /// The raw request body. Empty if it was already consumed.
    pub async fn body_bytes(&mut self) -> Result<Bytes, RouterError> {
        match self.body.take() {
            Some(body) => axum::body::to_bytes(body, self.max_body_bytes())
                .await
                .map_err(|e| RouterError::Parse(e.to_string())),
            None => Ok(Bytes::new()),
        }
    }

    /// Deserialize the request body as JSON.
    pub async fn json_body<T: DeserializeOwned>(&mut self) -> Result<T, RouterError> {
        let bytes = self.body_bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| RouterError::Parse(e.to_string()))
    }

    async fn parse_request(&mut self) -> Result<Params, RouterError> {
        let mut params = Params::new();
        if has_form_body(&self.parts) {
            let bytes = self.body_bytes().await?;
            decode_form(&bytes, &mut params);
        }
        if let Some(query) = self.parts.uri.query() {
            decode_form(query.as_bytes(), &mut params);
        }
        Ok(params)
    }

    fn max_body_bytes(&self) -> usize {
        self.config
            .lookup("max_body_bytes")
            .parse()
            .unwrap_or(DEFAULT_MAX_BODY_BYTES)
    }

    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn set_status(&mut self, status: StatusCode) {
        *self.response.status_mut() = status;
    }

    pub fn response_headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    pub fn response_headers_mut(&mut self) -> &mut HeaderMap {
        self.response.headers_mut()
    }

    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response.headers_mut().insert(name, value);
    }

    /// Replace the response body.
    pub fn write(&mut self, body: impl Into<Body>) {
        *self.response.body_mut() = body.into();
    }

    pub fn text(&mut self, body: impl Into<String>) {
        self.insert_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        self.write(body.into());
    }

    pub fn html(&mut self, body: impl Into<String>) {
        self.insert_header(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        self.write(body.into());
    }

    pub fn json<T: Serialize>(&mut self, value: &T) -> Result<(), RouterError> {
        let body = serde_json::to_vec(value).map_err(RouterError::other)?;
        self.insert_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.write(body);
        Ok(())
    }

    /// Replace the whole response.
    pub fn set_response(&mut self, response: Response<Body>) {
        self.response = response;
    }

    pub fn into_response(self) -> Response<Body> {
        self.response
    }

    /// Store request-scoped data under `key`.
    pub fn set_data<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.data.insert(key.into(), Box::new(value));
    }

    /// Data stored under `key`, if present and of type `T`.
    pub fn data<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.data.get(key).and_then(|v| v.downcast_ref())
    }

    pub fn remove_data(&mut self, key: &str) -> bool {
        self.data.remove(key).is_some()
    }

    pub fn production(&self) -> bool {
        self.config.production()
    }

    /// A value from the config collaborator.
    pub fn config(&self, key: &str) -> String {
        self.config.lookup(key)
    }
}

/// The message of a parse failure, without the variant's display prefix.
fn parse_message(err: RouterError) -> String {
    match err {
        RouterError::Parse(message) => message,
        other => other.to_string(),
    }
}
