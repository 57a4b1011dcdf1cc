//! Wire types for the key service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Payload carried by an [`Envelope`].
///
/// Only the multi-key lookup answers with a map; everything else is a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Text(String),
    Pairs(HashMap<String, String>),
}

impl Default for Message {
    fn default() -> Self {
        Message::Text(String::new())
    }
}

/// Uniform response body returned by every route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub error: bool,
    #[serde(default)]
    pub msg: Message,
}

impl Envelope {
    /// Successful response with an empty message.
    pub fn ok() -> Self {
        Self::text(String::new())
    }

    /// Successful response carrying a single value.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            error: false,
            msg: Message::Text(value.into()),
        }
    }

    /// Successful response carrying a key/value subset.
    pub fn pairs(pairs: HashMap<String, String>) -> Self {
        Self {
            error: false,
            msg: Message::Pairs(pairs),
        }
    }

    /// Failed response with a human readable reason.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            error: true,
            msg: Message::Text(reason.into()),
        }
    }
}

/// Body of the create and update requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Body of the multi-key lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysRequest {
    #[serde(default)]
    pub keys: Vec<String>,
}
