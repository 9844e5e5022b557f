//! WebSocket upgrade detection.
//!
//! A request is WebSocket-eligible only when both hold:
//! - the `Upgrade` header equals `websocket` (ASCII case-insensitive)
//! - the path is one of the enumerated streaming endpoints under `/api/<org>/`
//!
//! All eligible endpoints sit behind this single combined predicate so that
//! exactly one upgrade-capable rule exists in the routing table.

use axum::http::{header, HeaderMap};
use regex::Regex;

use crate::routing::matcher::{Matcher, RequestHead};

/// Streaming endpoints, relative to `/api/<org>/`.
pub const WEBSOCKET_ENDPOINTS: &[&str] = &[
    "websocket",
    "fdp-websocket",
    "terminal",
    "apim-ws/api-docs/filetree",
];

/// `true` when the `Upgrade` header asks for the WebSocket protocol.
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

/// Combined predicate over the upgrade header and the enumerated paths.
#[derive(Debug, Clone)]
pub struct WebSocketMatcher {
    paths: Regex,
}

impl WebSocketMatcher {
    pub fn new() -> Self {
        let alternatives = WEBSOCKET_ENDPOINTS
            .iter()
            .map(|e| regex::escape(e))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!("^/api/[^/]+/(?:{})(?:/.*)?$", alternatives);
        Self {
            paths: Regex::new(&pattern).expect("websocket endpoint pattern is valid"),
        }
    }

    /// Path half of the predicate.
    pub fn is_streaming_path(&self, path: &str) -> bool {
        self.paths.is_match(path)
    }
}

impl Default for WebSocketMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Matcher for WebSocketMatcher {
    fn matches(&self, req: &RequestHead<'_>) -> bool {
        is_websocket_upgrade(req.headers) && self.is_streaming_path(req.path)
    }
}
