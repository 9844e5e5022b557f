//! Failure reporting for the forwarding and fallback paths.
//!
//! Every I/O failure on a request path ends up here and is turned into a
//! plain-text 500. Nothing propagates past the handler. Upstream failures
//! carry the full cause chain in the body; shell failures only name the
//! failure, with the filesystem detail kept to the log.

use std::error::Error as StdError;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::fallback::ShellError;
use crate::observability::metrics;
use crate::routing::RuleId;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("failed to reach upstream {target}")]
    Upstream {
        rule: RuleId,
        target: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("upstream {target} did not respond within {timeout:?}")]
    Timeout {
        rule: RuleId,
        target: String,
        timeout: Duration,
    },

    #[error("invalid upstream address {target}")]
    InvalidUri {
        rule: RuleId,
        target: String,
        #[source]
        source: axum::http::uri::InvalidUri,
    },

    #[error("websocket handshake with {target} failed")]
    WebSocketHandshake {
        rule: RuleId,
        target: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("application shell unavailable")]
    Shell(#[from] ShellError),
}

impl GatewayError {
    pub fn rule(&self) -> Option<RuleId> {
        match self {
            GatewayError::Upstream { rule, .. }
            | GatewayError::Timeout { rule, .. }
            | GatewayError::InvalidUri { rule, .. }
            | GatewayError::WebSocketHandshake { rule, .. } => Some(*rule),
            GatewayError::Shell(_) => None,
        }
    }
}

/// The error and its sources joined with `": "`.
pub fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let detail = error_chain(&self);
        let rule = self.rule().map(|r| r.as_str()).unwrap_or("none");

        tracing::warn!(rule = rule, error = %detail, "Proxy error");
        metrics::record_upstream_error(rule);

        let body = match &self {
            GatewayError::Shell(_) => format!("proxy error: {}", self),
            _ => format!("proxy error: {}", detail),
        };
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}
