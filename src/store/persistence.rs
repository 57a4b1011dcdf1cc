//! Write-through persistence for mutating requests.
//!
//! Handlers that change the store attach a [`Mutated`] marker to their
//! response. [`persist_on_mutation`] wraps the handlers and, once the handler
//! has produced its response, rewrites the snapshot file when the marker is
//! present. Failures are logged and counted but never change the response.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::observability::metrics;
use crate::store::{KeyStore, SnapshotFile, StoreError};

/// Response extension marking that the store changed during the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutated;

/// Writes the store to its snapshot file.
#[derive(Clone)]
pub struct Persistence {
    store: Arc<KeyStore>,
    file: Arc<SnapshotFile>,
    // Encode and write happen under this lock so snapshots land in order.
    writer: Arc<Mutex<()>>,
}

impl Persistence {
    pub fn new(store: Arc<KeyStore>, file: SnapshotFile) -> Self {
        Self {
            store,
            file: Arc::new(file),
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn file(&self) -> &SnapshotFile {
        &self.file
    }

    /// Encode the current store and replace the snapshot file with it.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let _guard = self.writer.lock().await;

        let bytes = self.store.encode()?;
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || file.write(&bytes))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
    }
}

/// Middleware persisting the store after any request that mutated it.
pub async fn persist_on_mutation(
    State(persistence): State<Persistence>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    if response.extensions_mut().remove::<Mutated>().is_none() {
        return response;
    }

    match persistence.persist().await {
        Ok(()) => {
            tracing::debug!(path = %persistence.file().path().display(), "Snapshot written");
            metrics::record_persist("written");
        }
        Err(e) => {
            tracing::warn!(
                path = %persistence.file().path().display(),
                error = %e,
                "Snapshot write skipped; in-memory store remains authoritative"
            );
            metrics::record_persist("skipped");
        }
    }

    response
}
