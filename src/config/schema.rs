//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Base URLs of the proxied backend services.
    pub upstreams: UpstreamsConfig,

    /// Public-facing origin of the platform.
    pub public: PublicConfig,

    /// Names of the enabled platform modules.
    pub modules: Vec<String>,

    /// Organization path rewriting.
    pub rewrite: RewriteConfig,

    /// Git smart-HTTP passthrough detection.
    pub git: GitConfig,

    /// Fixed single-path passthroughs.
    pub routes: RoutesConfig,

    /// Application shell and static asset settings.
    pub shell: ShellConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream base URLs. A missing scheme means `http://`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamsConfig {
    /// Backend API server (required).
    pub api: Option<String>,

    /// User-center / auth service (required).
    pub uc: Option<String>,

    /// Git hosting service (required).
    pub git: Option<String>,

    /// Enterprise admin UI bundle server.
    pub enterprise_ui: Option<String>,

    /// Fast-data platform UI bundle server.
    pub fdp_ui: Option<String>,
}

/// Public origin advertised to the browser.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PublicConfig {
    pub scheme: String,
    pub host: String,
    /// Omitted from the public URL when `None` or the scheme default.
    pub port: Option<u16>,
}

impl Default for PublicConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: Some(8080),
        }
    }
}

/// Organization path rewriting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Strip the org segment from `/api/<org>/...` paths (production behaviour).
    pub org_paths: bool,

    /// Paths that are forwarded untouched even when they look org-scoped.
    pub exempt_prefixes: Vec<String>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            org_paths: true,
            exempt_prefixes: vec!["/api/files".to_string()],
        }
    }
}

/// Git smart-HTTP detection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitConfig {
    /// Path prefixes that always belong to the Git service.
    pub path_prefixes: Vec<String>,

    /// Case-insensitive `User-Agent` fragments identifying Git clients.
    pub user_agent_signatures: Vec<String>,

    /// Repository path pattern required alongside a Git `User-Agent`.
    pub repo_path_pattern: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            path_prefixes: vec!["/wb".to_string()],
            user_agent_signatures: vec![
                "git/".to_string(),
                "jgit/".to_string(),
                "go-git/".to_string(),
            ],
            repo_path_pattern: "^/[^/]+/dop/".to_string(),
        }
    }
}

/// Fixed passthrough routes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Exact paths forwarded to the API server.
    pub fixed_paths: Vec<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            fixed_paths: vec!["/metadata.json".to_string()],
        }
    }
}

/// Application shell configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Directory holding the pre-built static assets.
    pub static_dir: String,

    /// Shell template file name inside `static_dir`.
    pub template: String,

    /// File name of the environment-injected copy, written next to the template.
    pub generated: String,

    /// Template marker replaced by the runtime environment script.
    pub marker: String,

    /// Global variable the runtime environment is assigned to.
    pub global_name: String,

    /// Deep links whose trailing segments may contain dots.
    pub deep_link_pattern: String,

    /// Re-render the shell when the template changes.
    pub dev_mode: bool,

    /// Feature toggles exposed to the client application.
    pub features: BTreeMap<String, serde_json::Value>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            static_dir: "public".to_string(),
            template: "index.html".to_string(),
            generated: "index.generated.html".to_string(),
            marker: "<!-- runtime-env -->".to_string(),
            global_name: "__RUNTIME_ENV__".to_string(),
            deep_link_pattern: r"^/[^/]+/dop/projects/\d+/apps/\d+/repo(/.*)?$".to_string(),
            dev_mode: false,
            features: BTreeMap::new(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed until the upstream response head arrives, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 300,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
