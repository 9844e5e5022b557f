//! Edge gateway for a multi-module single-page web platform.
//!
//! Every request is either proxied to a backend through an ordered rule
//! table, served from the static directory, or answered with the
//! environment-injected application shell (or a plain 404).

pub mod config;
pub mod fallback;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::{GatewayConfig, ResolvedConfig};
pub use http::HttpServer;
pub use lifecycle::{Gateway, Shutdown};
