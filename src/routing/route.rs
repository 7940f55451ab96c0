//! A registered route: pattern, accepted methods and handler or redirect.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::{Method, StatusCode};

use crate::error::PatternError;
use crate::params::Params;
use crate::routing::handler::Handler;
use crate::routing::matcher::{path_matches, MethodSet};
use crate::routing::pattern::Pattern;

/// Where a redirect route sends the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub path: String,
    pub status: StatusCode,
}

/// A route shared by every request that matches it.
///
/// Nothing request-specific is stored here; [`Route::parse`] returns fresh
/// params on every call.
pub struct Route {
    pattern: Pattern,
    methods: MethodSet,
    handler: Option<Handler>,
    redirect: Option<RedirectTarget>,
}

impl Route {
    /// Create a route served by `handler`.
    pub fn new(pattern: &str, handler: Handler) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: Pattern::compile(pattern)?,
            methods: MethodSet::new(),
            handler: Some(handler),
            redirect: None,
        })
    }

    /// Create a route that only redirects.
    pub fn redirect_to(pattern: &str, target: RedirectTarget) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: Pattern::compile(pattern)?,
            methods: MethodSet::new(),
            handler: None,
            redirect: Some(target),
        })
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    pub fn redirect(&self) -> Option<&RedirectTarget> {
        self.redirect.as_ref()
    }

    pub fn methods(&self) -> Vec<Method> {
        self.methods.to_vec()
    }

    pub fn match_method(&self, method: &str) -> bool {
        self.methods.contains(method)
    }

    pub fn match_path(&self, path: &str, asset_prefix: &str) -> bool {
        path_matches(&self.pattern, path, asset_prefix)
    }

    /// Params extracted from `path` by this route's pattern.
    pub fn parse(&self, path: &str) -> Params {
        self.pattern.captures(path).into_iter().collect()
    }

    /// Build a path for this route from param values.
    pub fn url(&self, values: &HashMap<String, String>) -> Result<String, PatternError> {
        self.pattern.expand(values)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let methods = self.methods.to_vec();
        let names: Vec<&str> = methods.iter().map(Method::as_str).collect();
        write!(f, "[{}] {}", names.join(", "), self.pattern)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern.as_str())
            .field("methods", &self.methods.to_vec())
            .field("has_handler", &self.handler.is_some())
            .field("redirect", &self.redirect)
            .finish()
    }
}

/// Fluent access to a freshly registered route.
///
/// Method restrictions are meant to be applied during registration, before
/// the router starts serving.
#[derive(Debug, Clone)]
pub struct RouteHandle {
    route: Arc<Route>,
}

impl RouteHandle {
    pub(crate) fn new(route: Arc<Route>) -> Self {
        Self { route }
    }

    /// Accept GET only.
    pub fn get(self) -> Self {
        self.method(Method::GET)
    }

    /// Accept POST only.
    pub fn post(self) -> Self {
        self.method(Method::POST)
    }

    /// Accept PUT only.
    pub fn put(self) -> Self {
        self.method(Method::PUT)
    }

    /// Accept DELETE only.
    pub fn delete(self) -> Self {
        self.method(Method::DELETE)
    }

    /// Accept `method` and nothing else.
    pub fn method(self, method: Method) -> Self {
        self.route.methods.set_only(method);
        self
    }

    /// Accept `method` in addition to the current methods.
    pub fn accept(self, method: Method) -> Self {
        self.route.methods.insert(method);
        self
    }

    /// Replace the accepted methods. An empty list leaves them unchanged.
    pub fn methods(self, permitted: impl IntoIterator<Item = Method>) -> Self {
        if !self.route.methods.replace(permitted.into_iter().collect()) {
            tracing::warn!(route = %self.route.pattern, "Ignoring empty method list");
        }
        self
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }
}
