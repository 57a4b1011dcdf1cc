//! Network layer: serving a router over plain TCP or TLS.
//!
//! # Data Flow
//! ```text
//! bound TcpListener
//!     → tls.rs (optional: load PEM cert + key)
//!     → axum::serve / axum_server (connect info attached)
//!     → Router
//! ```
//!
//! # Design Decisions
//! - Peer addresses always reach handlers as `ConnectInfo<SocketAddr>`
//! - Graceful shutdown drains in-flight requests

pub mod tls;

use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::TlsConfig;
use crate::lifecycle::shutdown::wait_for;
use crate::lifecycle::StartupError;

/// Longest time TLS connections get to finish after shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Serve `router` on `listener` until `shutdown` fires.
pub async fn serve(
    router: Router,
    listener: TcpListener,
    tls: Option<&TlsConfig>,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), StartupError> {
    let addr = listener.local_addr().map_err(StartupError::Serve)?;
    let app = router.into_make_service_with_connect_info::<SocketAddr>();

    match tls {
        None => {
            tracing::info!(address = %addr, "Serving HTTP");
            axum::serve(listener, app)
                .with_graceful_shutdown(wait_for(shutdown))
                .await
                .map_err(StartupError::Serve)?;
        }
        Some(tls) => {
            let rustls = tls::load_tls_config(tls).await.map_err(StartupError::Tls)?;
            let std_listener = listener.into_std().map_err(StartupError::Serve)?;

            let handle = axum_server::Handle::new();
            let drain = handle.clone();
            tokio::spawn(async move {
                wait_for(shutdown).await;
                drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
            });

            tracing::info!(address = %addr, "Serving HTTPS");
            axum_server::from_tcp_rustls(std_listener, rustls)
                .handle(handle)
                .serve(app)
                .await
                .map_err(StartupError::Serve)?;
        }
    }

    tracing::info!(address = %addr, "Server stopped");
    Ok(())
}
