//! Gatekeeper reverse proxy.
//!
//! # Data Flow
//! ```text
//! client (usually through the edge network)
//!     → gate (locked identity / trusted ranges)
//!     → forward.rs (rewrite URI, X-Forwarded-For)
//!     → upstream key service
//! ```

pub mod forward;
pub mod server;

pub use forward::Upstream;
pub use server::GatekeeperServer;
