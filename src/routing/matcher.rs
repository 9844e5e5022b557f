//! Route matching logic.
//!
//! # Responsibilities
//! - Match path prefix (segment aware, case-sensitive)
//! - Match exact paths and path patterns
//! - Match `User-Agent` fragments (case-insensitive)
//! - Combine conditions with AND / OR semantics
//!
//! # Design Decisions
//! - Matchers are pure predicates over the request head
//! - Path matching is case-sensitive
//! - Patterns are compiled once, when the routing table is built

use axum::http::{header, HeaderMap, Method, Request};
use regex::Regex;

/// The parts of a request that routing decisions are made on.
#[derive(Debug, Clone, Copy)]
pub struct RequestHead<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub headers: &'a HeaderMap,
}

impl<'a> RequestHead<'a> {
    pub fn new(
        method: &'a Method,
        path: &'a str,
        query: Option<&'a str>,
        headers: &'a HeaderMap,
    ) -> Self {
        Self {
            method,
            path,
            query,
            headers,
        }
    }

    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        Self {
            method: req.method(),
            path: req.uri().path(),
            query: req.uri().query(),
            headers: req.headers(),
        }
    }

    /// Header value as a string, if present and valid ASCII.
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&'a str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &RequestHead<'_>) -> bool;
}

/// `true` when `path` equals `prefix` or continues it with a new segment.
pub fn has_path_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return path.starts_with('/');
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Matches any of a set of path prefixes on segment boundaries.
///
/// `/api/uc` matches `/api/uc` and `/api/uc/login`, not `/api/ucx`.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefixes: Vec<String>,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefixes: vec![prefix.into()],
        }
    }

    pub fn any_of(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &RequestHead<'_>) -> bool {
        self.prefixes.iter().any(|p| has_path_prefix(req.path, p))
    }
}

/// Matches a fixed set of exact paths.
#[derive(Debug, Clone)]
pub struct ExactPathMatcher {
    paths: Vec<String>,
}

impl ExactPathMatcher {
    pub fn new(paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl Matcher for ExactPathMatcher {
    fn matches(&self, req: &RequestHead<'_>) -> bool {
        self.paths.iter().any(|p| p == req.path)
    }
}

/// Matches the path against a compiled pattern.
#[derive(Debug, Clone)]
pub struct PathPatternMatcher {
    pattern: Regex,
}

impl PathPatternMatcher {
    pub fn new(pattern: Regex) -> Self {
        Self { pattern }
    }
}

impl Matcher for PathPatternMatcher {
    fn matches(&self, req: &RequestHead<'_>) -> bool {
        self.pattern.is_match(req.path)
    }
}

/// Matches when the `User-Agent` contains any of the given fragments.
#[derive(Debug, Clone)]
pub struct UserAgentMatcher {
    /// Lowercased fragments.
    signatures: Vec<String>,
}

impl UserAgentMatcher {
    pub fn new(signatures: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            signatures: signatures
                .into_iter()
                .map(|s| s.into().to_ascii_lowercase())
                .collect(),
        }
    }
}

impl Matcher for UserAgentMatcher {
    fn matches(&self, req: &RequestHead<'_>) -> bool {
        let Some(agent) = req.header(header::USER_AGENT) else {
            return false;
        };
        let agent = agent.to_ascii_lowercase();
        self.signatures.iter().any(|s| agent.contains(s.as_str()))
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &RequestHead<'_>) -> bool {
        self.matchers.iter().all(|m| m.matches(req))
    }
}

/// Combines multiple matchers with OR semantics.
#[derive(Debug)]
pub struct OrMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl OrMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for OrMatcher {
    fn matches(&self, req: &RequestHead<'_>) -> bool {
        self.matchers.iter().any(|m| m.matches(req))
    }
}
