//! Key/value storage subsystem.
//!
//! # Data Flow
//! ```text
//! startup:
//!     snapshot.rs (read keys.json, or create it)
//!     → keys.rs (KeyStore, shared via Arc)
//!
//! per request:
//!     handler → KeyStore operation
//!     → response tagged Mutated (create/update/delete only)
//!     → persistence.rs encodes the store and rewrites keys.json
//! ```
//!
//! # Design Decisions
//! - One coarse lock over the whole map; no reader/writer split
//! - Snapshot files are replaced by rename, never rewritten in place
//! - A failed snapshot write is logged and dropped, never retried

pub mod keys;
pub mod persistence;
pub mod snapshot;

use thiserror::Error;

pub use keys::KeyStore;
pub use persistence::{persist_on_mutation, Mutated, Persistence};
pub use snapshot::SnapshotFile;

/// Errors raised by store loading and dumping.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The snapshot is not a JSON object of string values.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(#[source] serde_json::Error),

    /// Reading or writing the backing file failed.
    #[error("snapshot I/O failure: {0}")]
    Io(#[from] std::io::Error),
}
