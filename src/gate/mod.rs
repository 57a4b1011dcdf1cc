//! Gatekeeping subsystem.
//!
//! # Data Flow
//! ```text
//! startup:
//!     ranges.rs (fetch IPv4 + IPv6 CIDR lists) → TrustedRanges (Arc)
//!
//! per request:
//!     ConnectInfo peer address → origin.rs (strip port)
//!     forwarded-identity header (Cf-Connecting-Ip)
//!     → access.rs AccessGate::authorize
//!         allow → next service (key service or reverse proxy)
//!         deny  → 400 envelope, downstream never runs
//! ```
//!
//! # Design Decisions
//! - Fail closed: an unparsable address is never trusted
//! - The gate is a plain layer, so it composes in front of any Router
//! - Ranges are swapped wholesale on refresh; readers never block

pub mod access;
pub mod origin;
pub mod ranges;

pub use access::{gate_middleware, guard, AccessGate, DEFAULT_FORWARDED_HEADER};
pub use origin::resolve_origin;
pub use ranges::{parse_range_list, Cidr, RangeParseError, RegistryError, TrustedRanges};
