//! Gatekeeper HTTP server: gate in front of a reverse proxy.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware,
    response::Response,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::GatekeeperConfig;
use crate::gate::{guard, AccessGate};
use crate::http::envelope::ApiError;
use crate::http::request::with_service_layers;
use crate::lifecycle::StartupError;
use crate::net;
use crate::observability::metrics;
use crate::proxy::forward::Upstream;

pub struct GatekeeperServer {
    router: Router,
    config: GatekeeperConfig,
}

impl GatekeeperServer {
    pub fn new(config: GatekeeperConfig, upstream: Upstream, gate: Arc<AccessGate>) -> Self {
        let router = Router::new()
            .fallback(forward)
            .with_state(Arc::new(upstream));

        let router = with_service_layers(
            guard(router, gate).layer(middleware::from_fn(metrics::track_requests)),
            Duration::from_secs(config.timeouts.request_secs),
            config.listener.max_body_bytes,
        );

        Self { router, config }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

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

/// Every path and method goes upstream once the gate has let it through.
async fn forward(
    State(upstream): State<Arc<Upstream>>,
    request: Request<Body>,
) -> Result<Response, ApiError> {
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    upstream.forward(request, client_ip).await
}
