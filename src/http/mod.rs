//! HTTP surface of the key service.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → request.rs (request ID, trace, timeout, body limit)
//!     → [gate, when configured]
//!     → store::persistence (wraps the handlers)
//!     → handlers.rs (one KeyStore operation each)
//!     → envelope.rs ({"error", "msg"} body)
//! ```

pub mod envelope;
pub mod handlers;
pub mod request;
pub mod server;

pub use envelope::{ApiError, Envelope, Message};
pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use server::KeyServer;
