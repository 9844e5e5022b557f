//! SPA fallback subsystem.
//!
//! # Data Flow
//! ```text
//! Request with no proxy rule and no static file
//!     → resolver.rs (extension / deep-link check)
//!     → Shell:    shell.rs (cached HTML with env.rs script injected), no-store
//!     → NotFound: plain-text 404
//!
//! Dev mode:
//!     watcher.rs (template changed) → shell.rs invalidate → re-render on next use
//! ```

pub mod env;
pub mod resolver;
pub mod shell;
pub mod watcher;

pub use env::RuntimeEnv;
pub use resolver::{FallbackDecision, FallbackResolver};
pub use shell::{ShellCache, ShellError};
pub use watcher::TemplateWatcher;
