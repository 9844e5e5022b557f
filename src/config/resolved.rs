//! Startup-resolved configuration.
//!
//! `ResolvedConfig` is the immutable view every subsystem receives: absolute
//! upstream URLs, compiled patterns and filesystem paths. It is produced once
//! from a validated [`GatewayConfig`] and never mutated afterwards.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use url::Url;

use crate::config::loader::ConfigError;
use crate::config::schema::{GatewayConfig, ObservabilityConfig};
use crate::config::validation::{
    normalize_upstream_url, public_origin, validate_config, ValidationError, FDP_MODULE,
};

/// Absolute upstream base URLs.
#[derive(Debug, Clone)]
pub struct Upstreams {
    pub api: Url,
    pub uc: Url,
    pub git: Url,
    pub enterprise_ui: Option<Url>,
    /// Only set when the fast-data module is enabled.
    pub fdp_ui: Option<Url>,
}

/// Organization path rewrite settings.
#[derive(Debug, Clone)]
pub struct OrgRewriteSettings {
    pub enabled: bool,
    pub exempt_prefixes: Vec<String>,
}

/// Git smart-HTTP detection settings.
#[derive(Debug, Clone)]
pub struct GitSettings {
    pub path_prefixes: Vec<String>,
    /// Lowercased `User-Agent` fragments.
    pub user_agent_signatures: Vec<String>,
    pub repo_path: Regex,
}

/// Shell and static asset settings.
#[derive(Debug, Clone)]
pub struct ShellSettings {
    pub static_dir: PathBuf,
    pub template_name: String,
    pub generated_name: String,
    pub marker: String,
    pub global_name: String,
    pub deep_link: Regex,
    pub dev_mode: bool,
    pub features: BTreeMap<String, serde_json::Value>,
}

impl ShellSettings {
    pub fn template_path(&self) -> PathBuf {
        self.static_dir.join(&self.template_name)
    }

    pub fn generated_path(&self) -> PathBuf {
        self.static_dir.join(&self.generated_name)
    }
}

/// Immutable configuration shared by the router, forwarder and shell.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub bind_address: String,
    pub upstreams: Upstreams,
    pub public_url: Url,
    pub modules: Vec<String>,
    pub org_rewrite: OrgRewriteSettings,
    pub git: GitSettings,
    pub fixed_paths: Vec<String>,
    pub shell: ShellSettings,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub observability: ObservabilityConfig,
}

impl ResolvedConfig {
    /// Validate and resolve a raw configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let upstream = |name: &'static str, raw: &str| {
            normalize_upstream_url(raw).map_err(|reason| {
                ConfigError::Validation(vec![
                    ValidationError::InvalidUpstream {
                        name,
                        value: raw.to_string(),
                        reason,
                    },
                ])
            })
        };
        let required = |name: &'static str, value: &Option<String>| match value {
            Some(raw) => upstream(name, raw),
            None => Err(ConfigError::Validation(vec![
                ValidationError::MissingUpstream(name),
            ])),
        };

        let raw = &config.upstreams;
        let fdp_enabled = config.modules.iter().any(|m| m == FDP_MODULE);
        let upstreams = Upstreams {
            api: required("api", &raw.api)?,
            uc: required("uc", &raw.uc)?,
            git: required("git", &raw.git)?,
            enterprise_ui: raw
                .enterprise_ui
                .as_deref()
                .map(|v| upstream("enterprise_ui", v))
                .transpose()?,
            fdp_ui: match (&raw.fdp_ui, fdp_enabled) {
                (Some(v), true) => Some(upstream("fdp_ui", v)?),
                _ => None,
            },
        };

        let public_url = public_origin(config).map_err(|reason| {
            ConfigError::Validation(vec![
                ValidationError::InvalidPublicOrigin(reason),
            ])
        })?;

        let pattern = |field: &'static str, value: &str| {
            Regex::new(value).map_err(|e| {
                ConfigError::Validation(vec![
                    ValidationError::InvalidPattern {
                        field,
                        reason: e.to_string(),
                    },
                ])
            })
        };

        Ok(Self {
            bind_address: config.listener.bind_address.clone(),
            upstreams,
            public_url,
            modules: config.modules.clone(),
            org_rewrite: OrgRewriteSettings {
                enabled: config.rewrite.org_paths,
                exempt_prefixes: config.rewrite.exempt_prefixes.clone(),
            },
            git: GitSettings {
                path_prefixes: config.git.path_prefixes.clone(),
                user_agent_signatures: config
                    .git
                    .user_agent_signatures
                    .iter()
                    .map(|s| s.to_ascii_lowercase())
                    .collect(),
                repo_path: pattern("git.repo_path_pattern", &config.git.repo_path_pattern)?,
            },
            fixed_paths: config.routes.fixed_paths.clone(),
            shell: ShellSettings {
                static_dir: PathBuf::from(&config.shell.static_dir),
                template_name: config.shell.template.clone(),
                generated_name: config.shell.generated.clone(),
                marker: config.shell.marker.clone(),
                global_name: config.shell.global_name.clone(),
                deep_link: pattern("shell.deep_link_pattern", &config.shell.deep_link_pattern)?,
                dev_mode: config.shell.dev_mode,
                features: config.shell.features.clone(),
            },
            connect_timeout: Duration::from_secs(config.timeouts.connect_secs),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            observability: config.observability.clone(),
        })
    }
}
