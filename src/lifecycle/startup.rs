//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve and validate configuration
//! - Render the application shell (fatal if the template is unusable)
//! - Start the dev-mode template watcher
//! - Build the upstream TLS client configuration
//! - Build the HTTP server; binding happens last
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::sync::Arc;

use notify::RecommendedWatcher;
use tokio::net::TcpListener;

use crate::config::{ConfigError, GatewayConfig, ResolvedConfig};
use crate::fallback::{RuntimeEnv, ShellCache, ShellError, TemplateWatcher};
use crate::http::{tls, HttpServer, SessionTracker};
use crate::lifecycle::Shutdown;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Shell(#[from] ShellError),

    #[error("failed to build upstream TLS configuration")]
    Tls(#[from] rustls::Error),

    #[error("failed to watch shell template")]
    Watch(#[from] notify::Error),

    #[error("failed to bind {address}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server failed")]
    Serve(#[source] std::io::Error),
}

/// A fully initialised gateway that has not started accepting traffic.
pub struct Gateway {
    server: HttpServer,
    shell: Arc<ShellCache>,
    // Dropping the watcher stops it.
    _watcher: Option<RecommendedWatcher>,
}

/// Build every subsystem from raw configuration.
pub fn prepare(config: &GatewayConfig) -> Result<Gateway, StartupError> {
    let resolved = ResolvedConfig::from_config(config)?;

    tracing::info!(
        bind_address = %resolved.bind_address,
        api = %resolved.upstreams.api,
        uc = %resolved.upstreams.uc,
        git = %resolved.upstreams.git,
        modules = ?resolved.modules,
        org_rewrite = resolved.org_rewrite.enabled,
        "Configuration resolved"
    );

    let env = RuntimeEnv::from_config(&resolved);
    let shell = Arc::new(ShellCache::load(&resolved.shell, &env)?);

    let watcher = if shell.dev_mode() {
        Some(TemplateWatcher::new(Arc::clone(&shell)).run()?)
    } else {
        None
    };

    let tls = tls::client_config()?;
    let server = HttpServer::new(resolved, Arc::clone(&shell), tls);
    Ok(Gateway {
        server,
        shell,
        _watcher: watcher,
    })
}

impl Gateway {
    pub fn config(&self) -> &ResolvedConfig {
        self.server.config()
    }

    pub fn shell(&self) -> &Arc<ShellCache> {
        &self.shell
    }

    pub fn sessions(&self) -> SessionTracker {
        self.server.sessions()
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, StartupError> {
        let address = self.config().bind_address.clone();
        TcpListener::bind(&address)
            .await
            .map_err(|source| StartupError::Bind { address, source })
    }

    /// Serve on `listener` until `shutdown` is triggered.
    pub async fn serve(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), StartupError> {
        let Gateway {
            server,
            _watcher: watcher,
            ..
        } = self;
        let result = server.run(listener, shutdown.subscribe()).await;
        drop(watcher);
        result.map_err(StartupError::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::error_chain;

    fn config_with_static_dir(dir: &std::path::Path) -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.upstreams.api = Some("127.0.0.1:9095".into());
        config.upstreams.uc = Some("127.0.0.1:8080".into());
        config.upstreams.git = Some("127.0.0.1:5566".into());
        config.shell.static_dir = dir.display().to_string();
        config
    }

    #[test]
    fn test_missing_upstream_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_static_dir(dir.path());
        config.upstreams.uc = None;

        let err = prepare(&config).err().unwrap();
        assert!(matches!(err, StartupError::Config(_)));
    }

    #[test]
    fn test_missing_template_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = prepare(&config_with_static_dir(dir.path())).err().unwrap();

        assert!(matches!(err, StartupError::Shell(ShellError::Template { .. })));
        assert!(error_chain(&err).contains("index.html"));
    }

    #[tokio::test]
    async fn test_prepare_renders_shell() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("index.html"),
            "<html><head><!-- runtime-env --></head></html>",
        )
        .unwrap();

        let gateway = prepare(&config_with_static_dir(dir.path())).unwrap();

        assert!(gateway.shell().is_cached());
        assert!(dir.path().join("index.generated.html").exists());
        assert_eq!(gateway.sessions().active_count(), 0);
    }
}
