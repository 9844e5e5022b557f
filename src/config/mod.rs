//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + GATEWAY_* environment
//!     → loader.rs (parse, deserialize, env overlay)
//!     → validation.rs (semantic checks, all errors collected)
//!     → resolved.rs (absolute URLs, compiled patterns)
//!     → ResolvedConfig (immutable, built once at startup)
//!     → passed by reference to router, forwarder and shell
//! ```
//!
//! # Design Decisions
//! - Config is immutable once resolved; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod resolved;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use resolved::ResolvedConfig;
pub use schema::GatewayConfig;
pub use schema::ListenerConfig;
pub use validation::ValidationError;
