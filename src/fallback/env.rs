//! Runtime environment injected into the application shell.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::ResolvedConfig;

/// Values the client application reads from `window.<global_name>`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeEnv {
    pub public_url: String,
    pub enabled_modules: Vec<String>,
    pub features: BTreeMap<String, serde_json::Value>,
    pub version: &'static str,
}

impl RuntimeEnv {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            public_url: config.public_url.as_str().trim_end_matches('/').to_string(),
            enabled_modules: config.modules.clone(),
            features: config.shell.features.clone(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// `<script>` element assigning the environment to `global_name`.
    ///
    /// `</` is escaped so string values cannot close the element early.
    pub fn to_script_tag(&self, global_name: &str) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?.replace("</", "<\\/");
        Ok(format!("<script>window.{} = {};</script>", global_name, json))
    }
}
