//! Client SDK for the KeyMan key service.
//!
//! The wire types in [`types`] are shared with the server so both sides agree
//! on the response envelope.

pub mod client;
pub mod types;

pub use client::{ClientError, KeyManClient};
pub use types::{Envelope, KeyRequest, KeysRequest, Message};
