//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with the single catch-all handler
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener with graceful shutdown
//! - Dispatch: proxy rule → forward / relay; no rule → static file → SPA fallback

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use rustls::ClientConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceExt;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ResolvedConfig;
use crate::fallback::{FallbackResolver, ShellCache};
use crate::http::error::GatewayError;
use crate::http::forward::{ForwardTimeouts, Forwarder};
use crate::http::request::{request_id, MakeRequestUuid};
use crate::http::response;
use crate::http::session::SessionTracker;
use crate::http::websocket::{self, UpstreamConnector};
use crate::observability::metrics;
use crate::routing::{RequestHead, Router as RuleTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub rules: Arc<RuleTable>,
    pub forwarder: Forwarder,
    pub upstream_ws: UpstreamConnector,
    pub fallback: FallbackResolver,
    pub shell: Arc<ShellCache>,
    pub static_files: ServeDir,
    pub sessions: SessionTracker,
    /// Request paths that must never expose the raw template.
    shell_paths: Arc<[String]>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: ResolvedConfig,
    sessions: SessionTracker,
}

impl HttpServer {
    /// Create a new HTTP server from resolved configuration and a loaded shell.
    pub fn new(config: ResolvedConfig, shell: Arc<ShellCache>, tls: Arc<ClientConfig>) -> Self {
        let rules = Arc::new(RuleTable::from_config(&config));
        let sessions = SessionTracker::new();
        let timeouts = ForwardTimeouts {
            connect: config.connect_timeout,
            request: config.request_timeout,
        };

        let state = AppState {
            rules,
            forwarder: Forwarder::new(timeouts, Arc::clone(&tls), &config.public_url),
            upstream_ws: UpstreamConnector::new(tls, config.request_timeout),
            fallback: FallbackResolver::new(config.shell.deep_link.clone()),
            shell,
            static_files: ServeDir::new(&config.shell.static_dir)
                .append_index_html_on_directories(false),
            sessions: sessions.clone(),
            shell_paths: vec![
                format!("/{}", config.shell.template_name),
                format!("/{}", config.shell.generated_name),
            ]
            .into(),
        };

        let router = Self::build_router(state);
        Self {
            router,
            config,
            sessions,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id(request),
                    )
                }),
            )
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            public_url = %self.config.public_url,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!(
            websocket_sessions = self.sessions.active_count(),
            "HTTP server stopped"
        );
        Ok(())
    }

    /// Live WebSocket session counter.
    pub fn sessions(&self) -> SessionTracker {
        self.sessions.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }
}

/// Main gateway handler.
/// Looks up a proxy rule; unmatched requests fall through to static files and the shell.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();

    let rules = Arc::clone(&state.rules);
    let rule = rules.match_request(&RequestHead::from_request(&request));

    let (label, response) = match rule {
        Some(rule) if rule.websocket => (
            rule.id.as_str(),
            websocket::proxy_upgrade(rule, &state.upstream_ws, &state.sessions, peer, request)
                .await,
        ),
        Some(rule) => {
            let response = match state.forwarder.forward(rule, peer, request).await {
                Ok(response) => response,
                Err(err) => err.into_response(),
            };
            (rule.id.as_str(), response)
        }
        None => ("none", serve_unrouted(&state, request).await),
    };

    metrics::record_request(method.as_str(), label, response.status().as_u16(), start_time);
    response
}

/// Static file if one exists, otherwise the SPA fallback decision.
async fn serve_unrouted(state: &AppState, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();
    let readable = request.method() == Method::GET || request.method() == Method::HEAD;

    if readable && state.shell_paths.iter().any(|p| *p == path) {
        return serve_shell(state).await;
    }

    if readable {
        let response = match state.static_files.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        if response.status() != StatusCode::NOT_FOUND {
            return response.map(Body::new);
        }
    }

    let decision = state.fallback.decide(&path);
    metrics::record_fallback(decision.as_str());
    tracing::debug!(path = %path, decision = decision.as_str(), "SPA fallback");

    if decision.should_serve_shell() {
        serve_shell(state).await
    } else {
        response::not_found()
    }
}

async fn serve_shell(state: &AppState) -> Response {
    match state.shell.get().await {
        Ok(html) => response::shell(html),
        Err(err) => GatewayError::from(err).into_response(),
    }
}
