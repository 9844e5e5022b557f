//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, headers)
//!     → router.rs (ordered rule scan)
//!     → matcher.rs / upgrade.rs (evaluate match conditions)
//!     → Return: matched ProxyRule or no-route
//!
//! Matched rule:
//!     → org_path.rs (canonical path + org)
//!     → rule.rs (upstream URL, injected headers)
//!
//! Route Compilation (at startup):
//!     ResolvedConfig
//!     → Fixed registration order, most specific first
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by registration)
//! - A single rule carries every WebSocket-eligible path

pub mod matcher;
pub mod org_path;
pub mod router;
pub mod rule;
pub mod upgrade;

pub use matcher::RequestHead;
pub use org_path::RoutedPath;
pub use router::Router;
pub use rule::{ProxyRule, RuleId};
