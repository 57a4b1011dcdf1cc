//! Key service HTTP server.
//!
//! # Responsibilities
//! - Build the Axum router for the key routes
//! - Wire up middleware (gate, persistence, metrics, tracing, limits, request ID)
//! - Serve on a bound listener until shutdown

use axum::{middleware, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::KeyManConfig;
use crate::gate::{guard, AccessGate};
use crate::http::handlers::{routes, AppState};
use crate::http::request::with_service_layers;
use crate::lifecycle::StartupError;
use crate::net;
use crate::observability::metrics;
use crate::store::{persist_on_mutation, KeyStore, Persistence, SnapshotFile};

/// HTTP server for the key service.
pub struct KeyServer {
    router: Router,
    config: KeyManConfig,
}

impl KeyServer {
    /// Assemble the server. Without a snapshot file mutations stay in memory;
    /// without a gate every caller is let through.
    pub fn new(
        config: KeyManConfig,
        store: Arc<KeyStore>,
        snapshot: Option<SnapshotFile>,
        gate: Option<Arc<AccessGate>>,
    ) -> Self {
        let router = Self::build_router(&config, store, snapshot, gate);
        Self { router, config }
    }

    /// Layers, innermost first: persistence, gate, metrics, then the shared
    /// trace/request-id/timeout/limit stack.
    fn build_router(
        config: &KeyManConfig,
        store: Arc<KeyStore>,
        snapshot: Option<SnapshotFile>,
        gate: Option<Arc<AccessGate>>,
    ) -> Router {
        let mut router = routes(AppState {
            store: store.clone(),
        });

        if let Some(snapshot) = snapshot {
            let persistence = Persistence::new(store, snapshot);
            router = router.layer(middleware::from_fn_with_state(persistence, persist_on_mutation));
        }
        if let Some(gate) = gate {
            router = guard(router, gate);
        }

        with_service_layers(
            router.layer(middleware::from_fn(metrics::track_requests)),
            Duration::from_secs(config.timeouts.request_secs),
            config.listener.max_body_bytes,
        )
    }

    /// A clone of the fully layered router (useful for in-process tests).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), StartupError> {
        net::serve(
            self.router,
            listener,
            self.config.listener.tls.as_ref(),
            shutdown,
        )
        .await
    }
}
