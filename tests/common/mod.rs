//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use spa_edge_proxy::config::GatewayConfig;
use spa_edge_proxy::http::SessionTracker;
use spa_edge_proxy::lifecycle::{self, Shutdown};

pub const SHELL_TEMPLATE: &str =
    "<!doctype html><html><head><!-- runtime-env --></head><body><div id=\"root\"></div></body></html>";

/// Start a mock backend that answers every request with its own request head.
///
/// The body is the request line followed by the headers exactly as received.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let text = String::from_utf8_lossy(&head);
                let body = text.split("\r\n\r\n").next().unwrap_or_default().to_string();

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a mock backend that reads the request and only answers after `delay`.
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                tokio::time::sleep(delay).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\nlate")
                    .await;
            });
        }
    });

    addr
}

/// Handshake details seen by a mock WebSocket upstream.
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    pub uri: String,
    pub cookie: Option<String>,
    pub protocol: Option<String>,
}

/// Start a mock WebSocket upstream.
///
/// Text and binary frames are echoed. A text frame `boom` drops the
/// connection without a close handshake. Offered subprotocols are accepted
/// by picking the first one.
pub async fn start_ws_upstream() -> (SocketAddr, Arc<Mutex<Vec<Handshake>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let callback = |req: &Request, mut resp: Response| -> Result<Response, ErrorResponse> {
                    let header = |name: &str| {
                        req.headers()
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string)
                    };
                    let protocol = header("sec-websocket-protocol");
                    if let Some(first) = protocol.as_deref().and_then(|p| p.split(',').next()) {
                        resp.headers_mut()
                            .insert("sec-websocket-protocol", first.trim().parse().unwrap());
                    }
                    log.lock().unwrap().push(Handshake {
                        uri: req.uri().to_string(),
                        cookie: header("cookie"),
                        protocol,
                    });
                    Ok(resp)
                };

                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(socket, callback).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    match msg {
                        Message::Text(text) if text.as_str() == "boom" => return,
                        Message::Text(_) | Message::Binary(_) => {
                            if ws.send(msg).await.is_err() {
                                return;
                            }
                        }
                        Message::Close(_) => return,
                        _ => {}
                    }
                }
            });
        }
    });

    (addr, seen)
}

/// A gateway serving on an ephemeral port with a temporary static directory.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub sessions: SessionTracker,
    pub static_dir: TempDir,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Configuration with all required upstreams pointing at `api`, `uc` and `git`.
pub fn gateway_config(api: SocketAddr, uc: SocketAddr, git: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.upstreams.api = Some(api.to_string());
    config.upstreams.uc = Some(uc.to_string());
    config.upstreams.git = Some(git.to_string());
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.timeouts.connect_secs = 1;
    config
}

/// Start a gateway. The static directory holds the shell template and `assets/app.js`.
pub async fn start_gateway(mut config: GatewayConfig) -> TestGateway {
    let static_dir = tempfile::tempdir().unwrap();
    std::fs::write(static_dir.path().join("index.html"), SHELL_TEMPLATE).unwrap();
    std::fs::create_dir(static_dir.path().join("assets")).unwrap();
    std::fs::write(static_dir.path().join("assets/app.js"), "console.log('app');").unwrap();
    config.shell.static_dir = static_dir.path().display().to_string();

    let gateway = lifecycle::prepare(&config).unwrap();
    let listener = gateway.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    let sessions = gateway.sessions();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = gateway.serve(listener, &server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestGateway {
        addr,
        sessions,
        static_dir,
        shutdown,
    }
}

/// HTTP client without connection reuse or system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Poll `condition` until it holds or a second passes.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
