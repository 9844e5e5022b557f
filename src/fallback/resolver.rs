//! Shell-or-404 decision for unrouted requests.
//!
//! Mirrors `try_files $uri /index.html`, except that asset-like paths (the
//! last segment contains a `.`) get a real 404 so missing assets are not
//! masked as soft navigations. Repository-browser deep links are the one
//! exception: their trailing segments are file names inside a repository.

use axum::http::HeaderValue;
use regex::Regex;

/// Outcome of the fallback decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackDecision {
    /// Serve the environment-injected application shell.
    Shell,
    /// Plain-text 404.
    NotFound,
}

impl FallbackDecision {
    pub fn should_serve_shell(&self) -> bool {
        matches!(self, FallbackDecision::Shell)
    }

    /// `Cache-Control` for the response; the shell is never cacheable.
    pub fn cache_control(&self) -> Option<HeaderValue> {
        match self {
            FallbackDecision::Shell => Some(HeaderValue::from_static("no-store")),
            FallbackDecision::NotFound => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackDecision::Shell => "shell",
            FallbackDecision::NotFound => "not_found",
        }
    }
}

/// `true` when the final path segment contains a `.`.
pub fn has_file_extension(path: &str) -> bool {
    path.rsplit('/').next().map(|last| last.contains('.')).unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct FallbackResolver {
    deep_link: Regex,
}

impl FallbackResolver {
    pub fn new(deep_link: Regex) -> Self {
        Self { deep_link }
    }

    pub fn decide(&self, path: &str) -> FallbackDecision {
        if !has_file_extension(path) || self.deep_link.is_match(path) {
            FallbackDecision::Shell
        } else {
            FallbackDecision::NotFound
        }
    }
}
