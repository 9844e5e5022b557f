//! HTTP forwarding to the upstream selected by a proxy rule.
//!
//! # Responsibilities
//! - Rewrite path and query through the rule
//! - Build the upstream request (headers, org injection, origin handling)
//! - Stream the upstream response back verbatim
//!
//! # Design Decisions
//! - Upstream connections are HTTP/1.1 only, plain or TLS per upstream scheme
//! - The request deadline covers connect plus response head; bodies stream unbounded
//! - Bodies are streamed in both directions; nothing is buffered
//! - No retries: a failed upstream yields a single 500 to the client

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request, Uri, Version};
use axum::response::Response;
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use rustls::ClientConfig;
use url::Url;

use crate::http::error::GatewayError;
use crate::http::headers::{append_forwarded, apply_origin, strip_hop_by_hop};
use crate::routing::ProxyRule;

/// Deadlines applied to every forwarded request.
#[derive(Debug, Clone, Copy)]
pub struct ForwardTimeouts {
    pub connect: Duration,
    /// Until the upstream response head arrives.
    pub request: Duration,
}

/// Pooled HTTP/1.1 client shared by all forwarding rules.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpsConnector<HttpConnector>, Body>,
    request_timeout: Duration,
    forwarded_proto: String,
}

impl Forwarder {
    pub fn new(timeouts: ForwardTimeouts, tls: Arc<ClientConfig>, public_url: &Url) -> Self {
        let mut http_connector = HttpConnector::new();
        http_connector.set_connect_timeout(Some(timeouts.connect));
        http_connector.set_nodelay(true);
        http_connector.enforce_http(false);

        let connector = HttpsConnectorBuilder::new()
            .with_tls_config(ClientConfig::clone(&tls))
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            request_timeout: timeouts.request,
            forwarded_proto: public_url.scheme().to_string(),
        }
    }

    /// Forward `request` through `rule` and return the upstream response.
    pub async fn forward(
        &self,
        rule: &ProxyRule,
        peer: SocketAddr,
        request: Request<Body>,
    ) -> Result<Response, GatewayError> {
        let (parts, body) = request.into_parts();

        let routed = rule.rewrite_path(parts.uri.path(), parts.uri.query());
        let upstream_url = rule.upstream_url(&routed);
        let uri: Uri = upstream_url
            .parse()
            .map_err(|source| GatewayError::InvalidUri {
                rule: rule.id,
                target: upstream_url.clone(),
                source,
            })?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        append_forwarded(&mut headers, peer.ip(), &self.forwarded_proto);
        apply_origin(&mut headers, &rule.target, rule.preserve_host);

        for (name, value) in rule.inject_headers(&routed) {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        }

        let mut upstream_request = Request::new(body);
        *upstream_request.method_mut() = parts.method.clone();
        *upstream_request.uri_mut() = uri;
        *upstream_request.version_mut() = Version::HTTP_11;
        *upstream_request.headers_mut() = headers;

        tracing::debug!(
            rule = %rule.id,
            method = %parts.method,
            target = %upstream_url,
            org = routed.org.as_deref().unwrap_or(""),
            "Forwarding request"
        );

        let pending = self.client.request(upstream_request);
        let response: hyper::Response<Incoming> =
            match tokio::time::timeout(self.request_timeout, pending).await {
                Ok(result) => result.map_err(|source| GatewayError::Upstream {
                    rule: rule.id,
                    target: upstream_url,
                    source,
                })?,
                Err(_) => {
                    return Err(GatewayError::Timeout {
                        rule: rule.id,
                        target: upstream_url,
                        timeout: self.request_timeout,
                    })
                }
            };

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::matcher::PathPrefixMatcher;
    use crate::routing::RuleId;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn forwarder(request: Duration) -> Forwarder {
        Forwarder::new(
            ForwardTimeouts {
                connect: Duration::from_secs(1),
                request,
            },
            crate::http::tls::client_config().unwrap(),
            &Url::parse("http://localhost:8080").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_error() {
        // Nothing listens on the discard port of the loopback address.
        let rule = ProxyRule::new(
            RuleId::Api,
            PathPrefixMatcher::new("/api"),
            Url::parse("http://127.0.0.1:9").unwrap(),
        );
        let forwarder = forwarder(Duration::from_secs(5));
        let request = Request::builder()
            .uri("/api/projects")
            .body(Body::empty())
            .unwrap();

        let err = forwarder
            .forward(&rule, "127.0.0.1:40000".parse().unwrap(), request)
            .await
            .unwrap_err();

        assert_eq!(err.rule(), Some(RuleId::Api));
        assert!(err.to_string().contains("http://127.0.0.1:9/api/projects"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_silent_upstream_times_out() {
        // Accepts the connection and reads the request but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let rule = ProxyRule::new(
            RuleId::UserCenter,
            PathPrefixMatcher::new("/api/uc"),
            Url::parse(&format!("http://{}", addr)).unwrap(),
        );
        let request = Request::builder()
            .uri("/api/uc/users")
            .body(Body::empty())
            .unwrap();

        let err = forwarder(Duration::from_millis(200))
            .forward(&rule, "127.0.0.1:40000".parse().unwrap(), request)
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Timeout { .. }));
        assert_eq!(err.rule(), Some(RuleId::UserCenter));
        assert!(err.to_string().contains("did not respond within"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
