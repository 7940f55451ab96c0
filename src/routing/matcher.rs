//! Route matching logic.
//!
//! # Responsibilities
//! - Match the request method against a route's accepted methods
//! - Match the canonical path against a route's pattern
//!
//! # Design Decisions
//! - An empty method is treated as GET
//! - Paths under the asset prefix never match a route; file serving owns them
//! - The short literal prefix is checked before any regex evaluation
//! - Compiled patterns match by regex, literal patterns by string equality

use std::sync::{PoisonError, RwLock};

use axum::http::Method;

use crate::routing::pattern::Pattern;

/// Default prefix for static assets served outside the route table.
pub const DEFAULT_ASSET_PREFIX: &str = "/assets";

/// The set of methods a route accepts. Never empty.
#[derive(Debug)]
pub struct MethodSet {
    methods: RwLock<Vec<Method>>,
}

impl MethodSet {
    /// A set accepting only GET.
    pub fn new() -> Self {
        Self {
            methods: RwLock::new(vec![Method::GET]),
        }
    }

    /// Returns true if `method` is accepted. `""` counts as GET.
    pub fn contains(&self, method: &str) -> bool {
        let method = if method.is_empty() { "GET" } else { method };
        self.methods
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|m| m.as_str() == method)
    }

    /// Accept `method` and nothing else.
    pub fn set_only(&self, method: Method) {
        *self.methods.write().unwrap_or_else(PoisonError::into_inner) = vec![method];
    }

    /// Accept `method` in addition to the current set.
    pub fn insert(&self, method: Method) {
        let mut methods = self.methods.write().unwrap_or_else(PoisonError::into_inner);
        if !methods.contains(&method) {
            methods.push(method);
        }
    }

    /// Replace the whole set. An empty list is ignored so the set stays usable.
    pub fn replace(&self, permitted: Vec<Method>) -> bool {
        if permitted.is_empty() {
            return false;
        }
        *self.methods.write().unwrap_or_else(PoisonError::into_inner) = permitted;
        true
    }

    pub fn to_vec(&self) -> Vec<Method> {
        self.methods.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Default for MethodSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Path matching policy applied to every route.
pub fn path_matches(pattern: &Pattern, path: &str, asset_prefix: &str) -> bool {
    if !asset_prefix.is_empty() && path.starts_with(asset_prefix) {
        return false;
    }

    let short = pattern.short_prefix();
    if !short.is_empty() && !path.starts_with(short) {
        return false;
    }

    pattern.is_match(path)
}
