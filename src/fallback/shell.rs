//! Cached, environment-injected application shell.
//!
//! The template is read and rendered once at startup; the rendered HTML is
//! written next to the template and kept in memory for every fallback
//! response. In dev mode the cache can be invalidated, and the next request
//! re-renders from disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use axum::body::Bytes;

use crate::config::resolved::ShellSettings;
use crate::fallback::env::RuntimeEnv;

/// Error type for shell rendering.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("shell template {} could not be read", .path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shell template {} has no {marker:?} marker", .path.display())]
    MissingMarker { path: PathBuf, marker: String },

    #[error("generated shell {} could not be written", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("runtime environment could not be serialized")]
    Serialize(#[from] serde_json::Error),
}

/// Insert `script` at the first occurrence of `marker`.
pub fn inject(template: &str, marker: &str, script: &str) -> Option<String> {
    template
        .contains(marker)
        .then(|| template.replacen(marker, script, 1))
}

#[derive(Debug)]
pub struct ShellCache {
    template_path: PathBuf,
    generated_path: PathBuf,
    marker: String,
    script: String,
    dev_mode: bool,
    cached: ArcSwapOption<Bytes>,
}

impl ShellCache {
    /// Render the shell from disk. A missing template or marker is fatal.
    pub fn load(settings: &ShellSettings, env: &RuntimeEnv) -> Result<Self, ShellError> {
        let cache = Self {
            template_path: settings.template_path(),
            generated_path: settings.generated_path(),
            marker: settings.marker.clone(),
            script: env.to_script_tag(&settings.global_name)?,
            dev_mode: settings.dev_mode,
            cached: ArcSwapOption::empty(),
        };

        let template = std::fs::read_to_string(&cache.template_path).map_err(|source| {
            ShellError::Template {
                path: cache.template_path.clone(),
                source,
            }
        })?;
        let html = cache.render(&template)?;
        std::fs::write(&cache.generated_path, &html).map_err(|source| ShellError::Write {
            path: cache.generated_path.clone(),
            source,
        })?;
        cache.cached.store(Some(Arc::new(Bytes::from(html))));

        tracing::info!(
            template = %cache.template_path.display(),
            generated = %cache.generated_path.display(),
            dev_mode = cache.dev_mode,
            "Application shell rendered"
        );
        Ok(cache)
    }

    fn render(&self, template: &str) -> Result<String, ShellError> {
        inject(template, &self.marker, &self.script).ok_or_else(|| ShellError::MissingMarker {
            path: self.template_path.clone(),
            marker: self.marker.clone(),
        })
    }

    /// Rendered shell HTML, re-rendering first if the cache was invalidated.
    pub async fn get(&self) -> Result<Bytes, ShellError> {
        if let Some(html) = self.cached.load_full() {
            return Ok(Bytes::clone(&html));
        }

        let template = tokio::fs::read_to_string(&self.template_path)
            .await
            .map_err(|source| ShellError::Template {
                path: self.template_path.clone(),
                source,
            })?;
        let html = Bytes::from(self.render(&template)?);
        tokio::fs::write(&self.generated_path, &html)
            .await
            .map_err(|source| ShellError::Write {
                path: self.generated_path.clone(),
                source,
            })?;

        self.cached.store(Some(Arc::new(html.clone())));
        tracing::debug!(template = %self.template_path.display(), "Application shell re-rendered");
        Ok(html)
    }

    /// Drop the cached artifact. Only honoured in dev mode.
    pub fn invalidate(&self) {
        if self.dev_mode {
            self.cached.store(None);
            tracing::info!(template = %self.template_path.display(), "Application shell invalidated");
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cached.load().is_some()
    }

    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    pub fn generated_path(&self) -> &Path {
        &self.generated_path
    }
}
