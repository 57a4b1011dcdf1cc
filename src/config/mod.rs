//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → CLI flag overrides (binaries)
//!     → validation.rs (semantic checks)
//!     → KeyManConfig / GatekeeperConfig (immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ensure_valid, load_config, load_or_default, ConfigError};
pub use schema::{
    GateConfig, GatekeeperConfig, KeyManConfig, ListenerConfig, ObservabilityConfig,
    StoreConfig, TimeoutConfig, TlsConfig, TrustedRangesConfig, UpstreamConfig,
};
pub use validation::{Validate, ValidationError};
