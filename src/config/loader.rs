//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value:?}")]
    Env { key: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from a TOML file, then apply environment overrides.
///
/// `None` starts from defaults. Semantic validation happens when the
/// configuration is resolved, see [`crate::config::ResolvedConfig`].
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Overlay env-style settings onto `config`. Set variables win over file values.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty("GATEWAY_BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(v) = non_empty("GATEWAY_API_URL") {
        config.upstreams.api = Some(v);
    }
    if let Some(v) = non_empty("GATEWAY_UC_URL") {
        config.upstreams.uc = Some(v);
    }
    if let Some(v) = non_empty("GATEWAY_GIT_URL") {
        config.upstreams.git = Some(v);
    }
    if let Some(v) = non_empty("GATEWAY_ENTERPRISE_UI_URL") {
        config.upstreams.enterprise_ui = Some(v);
    }
    if let Some(v) = non_empty("GATEWAY_FDP_UI_URL") {
        config.upstreams.fdp_ui = Some(v);
    }
    if let Some(v) = non_empty("GATEWAY_ENABLED_MODULES") {
        config.modules = v
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(v) = non_empty("GATEWAY_PUBLIC_SCHEME") {
        config.public.scheme = v;
    }
    if let Some(v) = non_empty("GATEWAY_PUBLIC_HOST") {
        config.public.host = v;
    }
    if let Some(v) = non_empty("GATEWAY_PUBLIC_PORT") {
        let port = v.trim().parse().map_err(|_| ConfigError::Env {
            key: "GATEWAY_PUBLIC_PORT",
            value: v.clone(),
        })?;
        config.public.port = Some(port);
    }
    if let Some(v) = non_empty("GATEWAY_DEV_MODE") {
        config.shell.dev_mode = match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                return Err(ConfigError::Env {
                    key: "GATEWAY_DEV_MODE",
                    value: v,
                })
            }
        };
    }

    Ok(())
}
