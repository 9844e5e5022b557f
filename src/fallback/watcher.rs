//! Shell template watcher for dev mode.
//!
//! The template's directory is watched rather than the file itself, so
//! editors that save by rename keep triggering events. Only events naming the
//! template invalidate the cache; writes of the generated copy next to it are
//! ignored.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::fallback::shell::ShellCache;

/// Invalidates the cached shell whenever the template changes on disk.
pub struct TemplateWatcher {
    dir: PathBuf,
    file_name: OsString,
    shell: Arc<ShellCache>,
}

impl TemplateWatcher {
    pub fn new(shell: Arc<ShellCache>) -> Self {
        let path = shell.template_path();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(OsString::from).unwrap_or_default();
        Self {
            dir,
            file_name,
            shell,
        }
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let TemplateWatcher {
            dir,
            file_name,
            shell,
        } = self;

        let watched_name = file_name.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let changed = event.kind.is_modify() || event.kind.is_create();
                    if changed && names_file(&event, &watched_name) {
                        tracing::info!("Shell template change detected");
                        shell.invalidate();
                    }
                }
                Err(e) => tracing::error!(error = %e, "Template watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(dir = ?dir, template = ?file_name, "Template watcher started");
        Ok(watcher)
    }
}

fn names_file(event: &Event, file_name: &OsString) -> bool {
    event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name.as_os_str()))
}
