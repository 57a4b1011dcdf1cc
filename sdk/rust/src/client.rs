//! HTTP client for the key service (directly or through the gatekeeper).

use reqwest::{Client, Response, StatusCode};
use std::collections::HashMap;
use thiserror::Error;

use crate::types::{Envelope, KeyRequest, KeysRequest, Message};

/// Errors returned by [`KeyManClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure or an unreadable body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error envelope.
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: StatusCode, message: String },

    /// The envelope did not carry the expected kind of message.
    #[error("unexpected payload: {0}")]
    UnexpectedPayload(&'static str),
}

pub struct KeyManClient {
    client: Client,
    base_url: String,
}

impl KeyManClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Use a preconfigured `reqwest` client (custom headers, TLS, pooling).
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the value stored under `key`.
    pub async fn get(&self, key: &str) -> Result<String, ClientError> {
        let resp = self
            .client
            .get(format!("{}/key/{}", self.base_url, key))
            .send()
            .await?;

        match read_envelope(resp).await?.msg {
            Message::Text(value) => Ok(value),
            Message::Pairs(_) => Err(ClientError::UnexpectedPayload("expected a single value")),
        }
    }

    /// Fetch every key of `keys` that exists; missing keys are omitted.
    pub async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, String>, ClientError> {
        let resp = self
            .client
            .post(format!("{}/keys", self.base_url))
            .json(&KeysRequest { keys: keys.to_vec() })
            .send()
            .await?;

        match read_envelope(resp).await?.msg {
            Message::Pairs(pairs) => Ok(pairs),
            // An empty object can't be told apart from an empty string by shape alone.
            Message::Text(text) if text.is_empty() => Ok(HashMap::new()),
            Message::Text(_) => Err(ClientError::UnexpectedPayload("expected a key/value map")),
        }
    }

    /// Create a key that must not exist yet.
    pub async fn create(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let resp = self
            .client
            .post(format!("{}/key", self.base_url))
            .json(&key_request(key, value))
            .send()
            .await?;
        read_envelope(resp).await.map(drop)
    }

    /// Replace the value of an existing key.
    pub async fn update(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let resp = self
            .client
            .put(format!("{}/key/{}", self.base_url, key))
            .json(&key_request(key, value))
            .send()
            .await?;
        read_envelope(resp).await.map(drop)
    }

    pub async fn delete(&self, key: &str) -> Result<(), ClientError> {
        let resp = self
            .client
            .delete(format!("{}/key/{}", self.base_url, key))
            .send()
            .await?;
        read_envelope(resp).await.map(drop)
    }

    /// List the routes served by the key service.
    pub async fn routes(&self) -> Result<Vec<String>, ClientError> {
        let resp = self.client.get(format!("{}/", self.base_url)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(rejection(status, resp).await);
        }
        Ok(resp.json().await?)
    }
}

fn key_request(key: &str, value: &str) -> KeyRequest {
    KeyRequest {
        key: key.to_string(),
        value: value.to_string(),
    }
}

async fn read_envelope(resp: Response) -> Result<Envelope, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(rejection(status, resp).await);
    }

    let envelope: Envelope = resp.json().await?;
    if envelope.error {
        return Err(ClientError::Rejected {
            status,
            message: describe(&envelope.msg),
        });
    }
    Ok(envelope)
}

async fn rejection(status: StatusCode, resp: Response) -> ClientError {
    let message = match resp.text().await {
        Ok(text) => match serde_json::from_str::<Envelope>(&text) {
            Ok(envelope) => describe(&envelope.msg),
            Err(_) => text,
        },
        Err(e) => e.to_string(),
    };
    ClientError::Rejected { status, message }
}

fn describe(msg: &Message) -> String {
    match msg {
        Message::Text(text) => text.clone(),
        Message::Pairs(pairs) => format!("{pairs:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_drops_trailing_slash() {
        let client = KeyManClient::with_client(Client::new(), "http://localhost:9902/");
        assert_eq!(client.base_url(), "http://localhost:9902");
    }
}
