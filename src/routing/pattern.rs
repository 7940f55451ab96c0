//! Route pattern compilation.
//!
//! Patterns are literal paths with `{name:regex}` placeholders:
//!
//! ```text
//! /tags/{id:[0-9]+}/destroy   →   ^/tags/([0-9]+)/destroy   params = ["id"]
//! ```
//!
//! # Design Decisions
//! - Anchored at the start only; trailing text after a match is allowed
//! - Placeholder regexes are used verbatim and may contain nested braces
//! - Patterns without placeholders are never compiled and match by string equality

use std::collections::HashMap;
use std::fmt;

use regex::Regex;

use crate::error::PatternError;

/// Length of the literal prefix checked before any regex evaluation.
const SHORT_PREFIX_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param { name: String, regex: String },
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    short_prefix: String,
    segments: Vec<Segment>,
    compiled: Option<Regex>,
    param_names: Vec<String>,
}

impl Pattern {
    /// Compile a pattern string.
    pub fn compile(raw: &str) -> Result<Self, PatternError> {
        let short_prefix = short_prefix(raw);
        let spans = find_braces(raw)?;

        if spans.is_empty() {
            return Ok(Self {
                raw: raw.to_string(),
                short_prefix,
                segments: vec![Segment::Literal(raw.to_string())],
                compiled: None,
                param_names: Vec::new(),
            });
        }

        let mut segments = Vec::with_capacity(spans.len() * 2 + 1);
        let mut end = 0;

        for (start, stop) in spans {
            if start > end {
                segments.push(Segment::Literal(raw[end..start].to_string()));
            }
            let inner = &raw[start + 1..stop - 1];
            let (name, regex) = inner.split_once(':').ok_or_else(|| PatternError::MissingSeparator {
                pattern: raw.to_string(),
                placeholder: raw[start..stop].to_string(),
            })?;
            segments.push(Segment::Param {
                name: name.to_string(),
                regex: regex.to_string(),
            });
            end = stop;
        }
        if end < raw.len() {
            segments.push(Segment::Literal(raw[end..].to_string()));
        }

        let mut expr = String::from("^");
        let mut param_names = Vec::new();
        for segment in &segments {
            match segment {
                Segment::Literal(text) => expr.push_str(&regex::escape(text)),
                Segment::Param { name, regex } => {
                    expr.push('(');
                    expr.push_str(regex);
                    expr.push(')');
                    param_names.push(name.clone());
                }
            }
        }

        let compiled = Regex::new(&expr).map_err(|source| PatternError::InvalidRegex {
            pattern: raw.to_string(),
            source,
        })?;

        // Capture group 0 is the whole match.
        let groups = compiled.captures_len() - 1;
        if groups != param_names.len() {
            return Err(PatternError::CaptureCount {
                pattern: raw.to_string(),
                params: param_names.len(),
                groups,
            });
        }

        Ok(Self {
            raw: raw.to_string(),
            short_prefix,
            segments,
            compiled: Some(compiled),
            param_names,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn short_prefix(&self) -> &str {
        &self.short_prefix
    }

    pub fn regex(&self) -> Option<&Regex> {
        self.compiled.as_ref()
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// True when the path matches, ignoring any method or prefix rules.
    pub fn is_match(&self, path: &str) -> bool {
        match &self.compiled {
            Some(re) => re.is_match(path),
            None => self.raw == path,
        }
    }

    /// Extract `name → value` for every placeholder the path fills.
    ///
    /// Returns an empty map for literal patterns and for paths that do not
    /// match.
    pub fn captures(&self, path: &str) -> HashMap<String, String> {
        let mut params = HashMap::new();
        let Some(re) = &self.compiled else {
            return params;
        };
        if let Some(caps) = re.captures(path) {
            for (i, name) in self.param_names.iter().enumerate() {
                if let Some(value) = caps.get(i + 1) {
                    params.insert(name.clone(), value.as_str().to_string());
                }
            }
        }
        params
    }

    /// Build a concrete path by substituting `values` into the placeholders.
    pub fn expand(&self, values: &HashMap<String, String>) -> Result<String, PatternError> {
        let mut path = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Param { name, .. } => {
                    let value = values.get(name).ok_or_else(|| PatternError::MissingValue {
                        pattern: self.raw.clone(),
                        name: name.clone(),
                    })?;
                    path.push_str(value);
                }
            }
        }
        Ok(path)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Byte spans `(open, close + 1)` of each top-level `{...}` in `s`.
///
/// A backslash escapes the following character, so `\{` and `\}` inside a
/// placeholder regex do not change the depth.
fn find_braces(s: &str) -> Result<Vec<(usize, usize)>, PatternError> {
    let unbalanced = || PatternError::UnbalancedBraces { pattern: s.to_string() };
    let bytes = s.as_bytes();
    let mut spans = Vec::new();
    let mut level: usize = 0;
    let mut open = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'{' => {
                if level == 0 {
                    open = i;
                }
                level += 1;
            }
            b'}' => {
                level = level.checked_sub(1).ok_or_else(unbalanced)?;
                if level == 0 {
                    spans.push((open, i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }

    if level != 0 {
        return Err(unbalanced());
    }
    Ok(spans)
}

/// Up to three characters of `raw` before the first `{`.
fn short_prefix(raw: &str) -> String {
    let literal = raw.split('{').next().unwrap_or("");
    literal.chars().take(SHORT_PREFIX_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_single_param() {
        let p = Pattern::compile("/tags/{id:[0-9]+}/destroy").unwrap();
        assert_eq!(p.regex().unwrap().as_str(), "^/tags/([0-9]+)/destroy");
        assert_eq!(p.param_names(), ["id"]);
        assert_eq!(p.short_prefix(), "/ta");

        assert!(p.is_match("/tags/42/destroy"));
        assert!(!p.is_match("/tags/abc/destroy"));
        assert_eq!(p.captures("/tags/42/destroy").get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_params_in_declaration_order() {
        let p = Pattern::compile("/{lang:[a-z]{2}}/posts/{year:\\d{4}}-{slug:[a-z-]+}").unwrap();
        assert_eq!(p.param_names(), ["lang", "year", "slug"]);
        assert_eq!(p.regex().unwrap().captures_len() - 1, 3);

        let caps = p.captures("/en/posts/2024-hello-world");
        assert_eq!(caps["lang"], "en");
        assert_eq!(caps["year"], "2024");
        assert_eq!(caps["slug"], "hello-world");
    }

    #[test]
    fn test_nested_braces() {
        let p = Pattern::compile(r"/a/{id:\d{2,4}}").unwrap();
        assert_eq!(p.captures("/a/123")["id"], "123");
        assert!(!p.is_match("/a/1"));
        // Not anchored at the end: the first four digits are captured.
        assert_eq!(p.captures("/a/123456")["id"], "1234");
    }

    #[test]
    fn test_unbalanced_braces() {
        for raw in ["/a/{id/b", "/a/id}/b", "/a/{id:{x}"] {
            match Pattern::compile(raw) {
                Err(PatternError::UnbalancedBraces { .. }) => {}
                other => panic!("expected unbalanced braces for {raw}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_missing_separator() {
        assert!(matches!(
            Pattern::compile("/a/{id}"),
            Err(PatternError::MissingSeparator { .. })
        ));
    }

    #[test]
    fn test_capturing_group_in_fragment_rejected() {
        assert!(matches!(
            Pattern::compile("/a/{id:(x|y)+}"),
            Err(PatternError::CaptureCount { params: 1, groups: 2, .. })
        ));
        assert!(Pattern::compile("/a/{id:(?:x|y)+}").is_ok());
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(
            Pattern::compile("/a/{id:[0-9}"),
            Err(PatternError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_literal_pattern() {
        let p = Pattern::compile("/about").unwrap();
        assert!(p.regex().is_none());
        assert!(p.is_match("/about"));
        assert!(!p.is_match("/about/team"));
        assert!(p.captures("/about").is_empty());
    }

    #[test]
    fn test_literal_text_escaped() {
        let p = Pattern::compile("/files/{name:[a-z]+}.txt").unwrap();
        assert!(p.is_match("/files/notes.txt"));
        assert!(!p.is_match("/files/notesXtxt"));
    }

    #[test]
    fn test_short_prefix() {
        assert_eq!(short_prefix("/{id:[0-9]+}"), "/");
        assert_eq!(short_prefix("{id:[0-9]+}"), "");
        assert_eq!(short_prefix("/a"), "/a");
        assert_eq!(short_prefix("/users/{id:[0-9]+}"), "/us");
    }

    #[test]
    fn test_expand_round_trip() {
        let p = Pattern::compile("/tags/{id:[0-9]+}/posts/{slug:[a-z-]+}").unwrap();
        for path in ["/tags/7/posts/a-b", "/tags/120/posts/x"] {
            let values = p.captures(path);
            let rebuilt = p.expand(&values).unwrap();
            assert_eq!(rebuilt, path);
            assert!(p.is_match(&rebuilt));
        }
        assert!(matches!(
            p.expand(&HashMap::new()),
            Err(PatternError::MissingValue { .. })
        ));
    }
}
