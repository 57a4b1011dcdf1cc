//! Access gate middleware.
//! Only the locked identity gets through, either directly or vouched for by a
//! trusted edge connection.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::gate::origin::{forwarded_identity, resolve_origin};
use crate::gate::ranges::TrustedRanges;
use crate::http::envelope::ApiError;
use crate::http::request::RequestIdExt;
use crate::observability::metrics;

/// Default header carrying the client address set by the edge network.
pub const DEFAULT_FORWARDED_HEADER: &str = "cf-connecting-ip";

/// Allow/deny decision for a single locked identity.
#[derive(Debug, Clone)]
pub struct AccessGate {
    locked_identity: String,
    forwarded_header: HeaderName,
    ranges: Arc<TrustedRanges>,
}

impl AccessGate {
    pub fn new(
        locked_identity: impl Into<String>,
        forwarded_header: HeaderName,
        ranges: Arc<TrustedRanges>,
    ) -> Self {
        Self {
            locked_identity: locked_identity.into(),
            forwarded_header,
            ranges,
        }
    }

    /// Decide whether a request may pass.
    ///
    /// With a forwarded identity, the claim must name the locked identity and
    /// the connection itself must come from a trusted range. Without one, the
    /// connection address must be the locked identity.
    pub fn authorize(&self, forwarded: &str, raw_remote: &str) -> bool {
        let origin = resolve_origin(raw_remote);
        if !forwarded.is_empty() {
            forwarded == self.locked_identity && self.ranges.contains_str(origin)
        } else {
            origin == self.locked_identity
        }
    }
}

/// Rejects every request the gate does not authorize with a 400 envelope.
pub async fn gate_middleware(
    State(gate): State<Arc<AccessGate>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let raw_remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();
    let forwarded = forwarded_identity(request.headers(), gate.forwarded_header.as_str());

    if gate.authorize(forwarded, &raw_remote) {
        metrics::record_gate_decision(true);
        return next.run(request).await;
    }

    tracing::warn!(
        request_id = %request.request_id(),
        remote = %raw_remote,
        forwarded = %forwarded,
        path = %request.uri().path(),
        "Access denied"
    );
    metrics::record_gate_decision(false);
    ApiError::AccessDenied.into_response()
}

/// Put the gate in front of every route of `router`, fallback included.
pub fn guard<S>(router: Router<S>, gate: Arc<AccessGate>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(gate, gate_middleware))
}
