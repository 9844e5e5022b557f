//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Required upstreams are present and parse as `http` URLs
//! - Module switches reference configured upstreams
//! - Patterns compile
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use regex::Regex;
use url::Url;

use crate::config::schema::GatewayConfig;

/// Module name that enables the fast-data UI passthrough.
pub const FDP_MODULE: &str = "fdp";

/// A single semantic configuration problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("required upstream `{0}` is not configured")]
    MissingUpstream(&'static str),

    #[error("upstream `{name}` has an invalid URL {value:?}: {reason}")]
    InvalidUpstream {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("module `{module}` is enabled but upstream `{upstream}` is not configured")]
    ModuleWithoutUpstream {
        module: &'static str,
        upstream: &'static str,
    },

    #[error("`{field}` is not a valid pattern: {reason}")]
    InvalidPattern { field: &'static str, reason: String },

    #[error("`{field}` entry {value:?} must start with '/'")]
    InvalidPath { field: &'static str, value: String },

    #[error("`{0}` must not be empty")]
    Empty(&'static str),

    #[error("public origin is invalid: {0}")]
    InvalidPublicOrigin(String),
}

/// Prefix `http://` when no scheme is present and parse.
pub fn normalize_upstream_url(raw: &str) -> Result<Url, String> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };

    let url = Url::parse(&with_scheme).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme `{}`", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(url)
}

/// Build the public origin URL from scheme, host and optional port.
pub fn public_origin(config: &GatewayConfig) -> Result<Url, String> {
    let public = &config.public;
    let raw = match public.port {
        Some(port) => format!("{}://{}:{}", public.scheme, public.host, port),
        None => format!("{}://{}", public.scheme, public.host),
    };
    Url::parse(&raw).map_err(|e| e.to_string())
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let upstreams = &config.upstreams;

    let required = [
        ("api", &upstreams.api),
        ("uc", &upstreams.uc),
        ("git", &upstreams.git),
    ];
    for (name, value) in required {
        match value {
            None => errors.push(ValidationError::MissingUpstream(name)),
            Some(raw) => check_upstream(name, raw, &mut errors),
        }
    }

    let optional = [
        ("enterprise_ui", &upstreams.enterprise_ui),
        ("fdp_ui", &upstreams.fdp_ui),
    ];
    for (name, value) in optional {
        if let Some(raw) = value {
            check_upstream(name, raw, &mut errors);
        }
    }

    if config.modules.iter().any(|m| m == FDP_MODULE) && upstreams.fdp_ui.is_none() {
        errors.push(ValidationError::ModuleWithoutUpstream {
            module: FDP_MODULE,
            upstream: "fdp_ui",
        });
    }

    check_pattern("git.repo_path_pattern", &config.git.repo_path_pattern, &mut errors);
    check_pattern("shell.deep_link_pattern", &config.shell.deep_link_pattern, &mut errors);

    check_paths("rewrite.exempt_prefixes", &config.rewrite.exempt_prefixes, &mut errors);
    check_paths("git.path_prefixes", &config.git.path_prefixes, &mut errors);
    check_paths("routes.fixed_paths", &config.routes.fixed_paths, &mut errors);

    if config.git.user_agent_signatures.iter().any(|s| s.trim().is_empty()) {
        errors.push(ValidationError::Empty("git.user_agent_signatures"));
    }
    if config.shell.marker.is_empty() {
        errors.push(ValidationError::Empty("shell.marker"));
    }
    if config.shell.template.is_empty() {
        errors.push(ValidationError::Empty("shell.template"));
    }
    if config.shell.generated.is_empty() || config.shell.generated == config.shell.template {
        errors.push(ValidationError::Empty("shell.generated"));
    }
    if config.shell.global_name.is_empty() {
        errors.push(ValidationError::Empty("shell.global_name"));
    }

    if let Err(reason) = public_origin(config) {
        errors.push(ValidationError::InvalidPublicOrigin(reason));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_upstream(name: &'static str, raw: &str, errors: &mut Vec<ValidationError>) {
    if let Err(reason) = normalize_upstream_url(raw) {
        errors.push(ValidationError::InvalidUpstream {
            name,
            value: raw.to_string(),
            reason,
        });
    }
}

fn check_pattern(field: &'static str, pattern: &str, errors: &mut Vec<ValidationError>) {
    if let Err(e) = Regex::new(pattern) {
        errors.push(ValidationError::InvalidPattern {
            field,
            reason: e.to_string(),
        });
    }
}

fn check_paths(field: &'static str, paths: &[String], errors: &mut Vec<ValidationError>) {
    for path in paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::InvalidPath {
                field,
                value: path.clone(),
            });
        }
    }
}
