//! SFHS: the HTTP gateway fronting SFRODB for browser clients.
//!
//! [`Gateway::bind`] dials a backing [`sfrodb_client::ClientPool`] and
//! opens the HTTP listener; [`Gateway::run`] serves `GET /{key}` until its
//! [`Gateway::shutdown_handle`] is cancelled, mirroring the bind/run split
//! `sfrodb-server::Server` uses for the wire-protocol listeners.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod app;
mod config;
mod error;

use std::{net::TcpListener, sync::Arc, time::Duration};

pub use app::router;
use app::AppState;
pub use config::{GatewayConfig, ListenMode};
pub use error::GatewayError;
use sfrodb_client::ClientPool;
use sfrodb_core::CoreError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Buffer size of the channel carrying server-class errors from request
/// handlers to the background listener; see
/// [`GatewayConfig::max_consecutive_server_errors`] for the shutdown
/// threshold itself.
const ERROR_CHANNEL_CAPACITY: usize = 64;

/// Graceful-shutdown grace period given to in-flight requests once
/// [`Gateway::shutdown_handle`]'s token is cancelled.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A bound, not-yet-serving gateway.
pub struct Gateway {
    config: GatewayConfig,
    state: Arc<AppState>,
    cancel: CancellationToken,
    error_rx: mpsc::Receiver<CoreError>,
    listener: TcpListener,
}

impl Gateway {
    /// Start the backing client pool and open the HTTP listener.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Bind`] if the listener cannot be opened;
    /// [`GatewayError::Pool`] if the backing client pool fails to dial
    /// every connection.
    pub async fn bind(config: GatewayConfig) -> Result<Self, GatewayError> {
        let listener = TcpListener::bind(config.listen_addr()).map_err(GatewayError::Bind)?;
        listener.set_nonblocking(true).map_err(GatewayError::Bind)?;

        let pool = Arc::new(ClientPool::new(config.pool_size, config.client.clone()));
        pool.start().await?;

        let (tx, rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        let state = Arc::new(AppState::new(pool, config.clone(), tx));

        Ok(Self { config, state, cancel: CancellationToken::new(), error_rx: rx, listener })
    }

    /// Local address of the HTTP listener, useful for tests that bind to
    /// port 0.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Bind`] if the OS cannot report the bound address.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, GatewayError> {
        self.listener.local_addr().map_err(GatewayError::Bind)
    }

    /// A token that, once cancelled, starts graceful shutdown: the HTTP
    /// server stops accepting new connections and gives in-flight
    /// requests [`SHUTDOWN_GRACE`] to finish before `run` returns.
    #[must_use]
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Serve `GET /{key}` until the shutdown token is cancelled, then stop
    /// the backing client pool.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Tls`] if HTTPS is configured and the certificate or
    /// key cannot be loaded; [`GatewayError::Bind`] if the listener fails
    /// mid-flight.
    pub async fn run(self) -> Result<(), GatewayError> {
        let Self { config, state, cancel, error_rx, listener } = self;

        tokio::spawn(run_error_listener(error_rx, cancel.clone(), config.max_consecutive_server_errors));

        let app = router(state.clone());
        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            info!("gateway shutdown requested, draining in-flight requests");
            shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });

        let result = match &config.mode {
            ListenMode::Http => {
                axum_server::from_tcp(listener).handle(handle).serve(app.into_make_service()).await
            }
            ListenMode::Https { cert_path, key_path } => {
                let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path)
                    .await
                    .map_err(GatewayError::Tls)?;
                axum_server::from_tcp_rustls(listener, tls).handle(handle).serve(app.into_make_service()).await
            }
        };

        state.pool.shutdown().await;
        result.map_err(GatewayError::Bind)
    }
}

/// Drains server-class errors the handler reports, logging each one. Once
/// `threshold` errors have been observed with `threshold != 0`, it cancels
/// `cancel`, which `Gateway::run`'s caller awaits to exit.
async fn run_error_listener(mut rx: mpsc::Receiver<CoreError>, cancel: CancellationToken, threshold: u32) {
    let mut count: u32 = 0;
    while let Some(err) = rx.recv().await {
        count += 1;
        error!(error = %err, count, "server-class error reported by gateway handler");
        if threshold != 0 && count >= threshold {
            warn!(threshold, "consecutive server-error threshold reached, shutting gateway down");
            cancel.cancel();
            break;
        }
    }
}
