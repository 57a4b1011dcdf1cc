//! KeyMan: a small key-value service behind an IP-locked gatekeeper.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ gatekeeper (:9901, TLS)             keyman (:9902)
//!                ┌──────────────────────┐            ┌──────────────────────────┐
//!                │ gate                 │            │ [gate]                   │
//!                │  origin + trusted    │  forward   │ handlers ──▶ KeyStore    │
//!                │  ranges              │ ─────────▶ │     │                    │
//!                │ proxy::Upstream      │            │     ▼                    │
//!                └──────────────────────┘            │ persistence ──▶ keys.json│
//!                                                    └──────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod gate;
pub mod http;
pub mod net;
pub mod proxy;
pub mod store;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::{GatekeeperConfig, KeyManConfig};
pub use gate::AccessGate;
pub use http::KeyServer;
pub use lifecycle::Shutdown;
pub use proxy::GatekeeperServer;
pub use store::KeyStore;
