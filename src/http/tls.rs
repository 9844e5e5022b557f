//! Client-side TLS for `https` and `wss` upstreams.
//!
//! One `rustls::ClientConfig` is built at startup and shared by the HTTP
//! connector and the WebSocket connector. Trust anchors are the Mozilla roots
//! bundled by `webpki-roots`, so the gateway does not depend on the host's
//! certificate store.

use std::sync::Arc;

use rustls::{ClientConfig, RootCertStore};

/// Build the shared upstream TLS configuration.
pub fn client_config() -> Result<Arc<ClientConfig>, rustls::Error> {
    let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    // Explicit provider: no process-wide default needs to be installed.
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(Arc::new(config))
}
