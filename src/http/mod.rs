//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span)
//!     → [routing decides the proxy rule]
//!     → forward.rs (HTTP relay) | websocket.rs (upgrade relay, session.rs)
//!       both dial plain or TLS upstreams (tls.rs)
//!     → no rule: static file, then SPA fallback (response.rs)
//!     → error.rs (any failure → plain-text 500)
//! ```

pub mod error;
pub mod forward;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;
pub mod session;
pub mod tls;
pub mod websocket;

pub use error::{error_chain, GatewayError};
pub use forward::{ForwardTimeouts, Forwarder};
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
pub use session::{SessionGuard, SessionId, SessionTracker};
