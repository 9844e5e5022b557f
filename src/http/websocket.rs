//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Open the upstream WebSocket before accepting the client upgrade
//! - Forward the handshake headers the upstream authenticates with
//! - Bidirectional frame forwarding until either side closes
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Gateway ←──── WebSocket frames ────→ Upstream
//! ```
//!
//! # Design Decisions
//! - Frame-level forwarding (no message buffering)
//! - Close frames propagated in both directions
//! - Ping/pong relayed, not answered locally
//! - A relay failure ends that session only; errors are logged, never raised
//! - The upstream handshake shares the HTTP request deadline

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ws::{self, WebSocket, WebSocketUpgrade};
use axum::extract::FromRequestParts;
use axum::http::{header, HeaderValue, Request};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use rustls::ClientConfig;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self as tungstenite, Message};
use tokio_tungstenite::{
    connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream,
};

use crate::http::error::GatewayError;
use crate::http::session::{SessionGuard, SessionTracker};
use crate::routing::ProxyRule;

type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handshake headers copied to the upstream connection.
const FORWARDED_HANDSHAKE_HEADERS: [header::HeaderName; 4] = [
    header::SEC_WEBSOCKET_PROTOCOL,
    header::COOKIE,
    header::AUTHORIZATION,
    header::USER_AGENT,
];

#[derive(Debug, thiserror::Error)]
enum RelayError {
    #[error("client socket failed")]
    Client(#[source] axum::Error),
    #[error("upstream socket failed")]
    Upstream(#[source] tungstenite::Error),
}

/// `ws://` or `wss://` form of an upstream HTTP URL.
pub fn websocket_url(upstream_url: &str) -> String {
    if let Some(rest) = upstream_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if let Some(rest) = upstream_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else {
        upstream_url.to_string()
    }
}

/// Dials upstream WebSocket endpoints.
#[derive(Clone)]
pub struct UpstreamConnector {
    tls: Arc<ClientConfig>,
    handshake_timeout: Duration,
}

impl UpstreamConnector {
    pub fn new(tls: Arc<ClientConfig>, handshake_timeout: Duration) -> Self {
        Self {
            tls,
            handshake_timeout,
        }
    }

    async fn connect(
        &self,
        rule: &ProxyRule,
        target: &str,
        request: tungstenite::handshake::client::Request,
    ) -> Result<(UpstreamSocket, tungstenite::handshake::client::Response), GatewayError> {
        let connector = Connector::Rustls(Arc::clone(&self.tls));
        let pending = connect_async_tls_with_config(request, None, false, Some(connector));
        match tokio::time::timeout(self.handshake_timeout, pending).await {
            Ok(result) => result.map_err(|source| GatewayError::WebSocketHandshake {
                rule: rule.id,
                target: target.to_string(),
                source,
            }),
            Err(_) => Err(GatewayError::Timeout {
                rule: rule.id,
                target: target.to_string(),
                timeout: self.handshake_timeout,
            }),
        }
    }
}

/// Relay an upgrade request matched by a WebSocket-eligible rule.
pub async fn proxy_upgrade(
    rule: &ProxyRule,
    connector: &UpstreamConnector,
    sessions: &SessionTracker,
    peer: SocketAddr,
    request: Request<Body>,
) -> Response {
    let (mut parts, _body) = request.into_parts();

    let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    let routed = rule.rewrite_path(parts.uri.path(), parts.uri.query());
    let target = websocket_url(&rule.upstream_url(&routed));

    let mut upstream_request = match target.as_str().into_client_request() {
        Ok(request) => request,
        Err(source) => {
            return GatewayError::WebSocketHandshake {
                rule: rule.id,
                target,
                source,
            }
            .into_response()
        }
    };
    for name in FORWARDED_HANDSHAKE_HEADERS {
        for value in parts.headers.get_all(&name) {
            upstream_request.headers_mut().append(&name, value.clone());
        }
    }
    for (name, value) in rule.inject_headers(&routed) {
        if let Ok(value) = HeaderValue::from_str(&value) {
            upstream_request.headers_mut().insert(name, value);
        }
    }

    let (upstream, handshake) = match connector.connect(rule, &target, upstream_request).await {
        Ok(connected) => connected,
        Err(err) => return err.into_response(),
    };

    let selected_protocol = handshake
        .headers()
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let upgrade = match selected_protocol {
        Some(protocol) => upgrade.protocols([protocol]),
        None => upgrade,
    };

    let guard = sessions.track();
    tracing::info!(
        session_id = %guard.id(),
        rule = %rule.id,
        peer = %peer,
        target = %target,
        org = routed.org.as_deref().unwrap_or(""),
        "WebSocket session opened"
    );

    let session_id = guard.id();
    upgrade
        .on_failed_upgrade(move |err| {
            tracing::warn!(session_id = %session_id, error = %err, "Client upgrade failed");
        })
        .on_upgrade(move |client| relay(client, upstream, guard))
}

async fn relay(client: WebSocket, upstream: UpstreamSocket, guard: SessionGuard) {
    let (mut client_tx, mut client_rx) = client.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();

    let client_to_upstream = async {
        while let Some(msg) = client_rx.next().await {
            let msg = msg.map_err(RelayError::Client)?;
            let closing = matches!(msg, ws::Message::Close(_));
            upstream_tx
                .send(to_upstream(msg))
                .await
                .map_err(RelayError::Upstream)?;
            if closing {
                break;
            }
        }
        Ok::<(), RelayError>(())
    };

    let upstream_to_client = async {
        while let Some(msg) = upstream_rx.next().await {
            let msg = msg.map_err(RelayError::Upstream)?;
            let closing = matches!(msg, Message::Close(_));
            let Some(msg) = to_client(msg) else {
                continue;
            };
            client_tx.send(msg).await.map_err(RelayError::Client)?;
            if closing {
                break;
            }
        }
        Ok::<(), RelayError>(())
    };

    let result = tokio::select! {
        result = client_to_upstream => result,
        result = upstream_to_client => result,
    };

    match result {
        Ok(()) => tracing::info!(session_id = %guard.id(), "WebSocket session closed"),
        Err(err) => tracing::warn!(
            session_id = %guard.id(),
            error = %crate::http::error::error_chain(&err),
            "WebSocket session terminated"
        ),
    }

    // Either direction ending tears down both sides.
    let _ = client_tx.close().await;
    let _ = upstream_tx.close().await;
}

fn to_upstream(msg: ws::Message) -> Message {
    match msg {
        ws::Message::Text(text) => Message::Text(text.to_string().into()),
        ws::Message::Binary(data) => Message::Binary(data),
        ws::Message::Ping(data) => Message::Ping(data),
        ws::Message::Pong(data) => Message::Pong(data),
        ws::Message::Close(frame) => Message::Close(frame.map(|f| CloseFrame {
            code: CloseCode::from(f.code),
            reason: f.reason.to_string().into(),
        })),
    }
}

fn to_client(msg: Message) -> Option<ws::Message> {
    let msg = match msg {
        Message::Text(text) => ws::Message::Text(text.to_string().into()),
        Message::Binary(data) => ws::Message::Binary(data),
        Message::Ping(data) => ws::Message::Ping(data),
        Message::Pong(data) => ws::Message::Pong(data),
        Message::Close(frame) => ws::Message::Close(frame.map(|f| ws::CloseFrame {
            code: u16::from(f.code),
            reason: f.reason.to_string().into(),
        })),
        Message::Frame(_) => return None,
    };
    Some(msg)
}
