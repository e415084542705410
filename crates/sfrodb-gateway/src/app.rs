//! The gateway's HTTP surface: `GET /{key}` mapped onto a pooled client's
//! `show_data`, plus a liveness route.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use sfrodb_client::ClientPool;
use sfrodb_core::{CoreError, Uid};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::GatewayConfig;

/// Shared state behind every request handler.
pub struct AppState {
    pool: Arc<ClientPool>,
    config: GatewayConfig,
    server_errors: mpsc::Sender<CoreError>,
}

impl AppState {
    /// Bundle a started client pool, the gateway's configuration, and the
    /// channel the handler reports server-class errors on.
    pub(crate) fn new(pool: Arc<ClientPool>, config: GatewayConfig, server_errors: mpsc::Sender<CoreError>) -> Self {
        Self { pool, config, server_errors }
    }
}

/// Build the router: `GET /{key}` and `GET /healthz`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/healthz", get(healthz)).route("/{key}", get(show_data)).with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn show_data(State(state): State<Arc<AppState>>, Path(key): Path<String>) -> Response {
    let uid = match Uid::parse(&key) {
        Ok(uid) => uid,
        Err(_) => return client_error_response(),
    };

    let pooled = match acquire_with_retry(&state).await {
        Ok(pooled) => pooled,
        Err(()) => return server_error_response(),
    };

    match pooled.show_data(&uid).await {
        Ok(data) => {
            release(&state, pooled, false).await;
            success_response(&state.config, data)
        }
        Err(e) if e.is_client_error() => {
            release(&state, pooled, false).await;
            client_error_response()
        }
        Err(e) => {
            release(&state, pooled, true).await;
            report_server_error(&state, e).await;
            server_error_response()
        }
    }
}

/// Poll `acquire` with the configured retry budget instead of failing
/// immediately on a momentarily exhausted pool.
async fn acquire_with_retry(state: &AppState) -> Result<sfrodb_client::PooledClient<'_>, ()> {
    for attempt in 0..state.config.acquire_retry_attempts.max(1) {
        match state.pool.acquire().await {
            Ok(pooled) => return Ok(pooled),
            Err(CoreError::PoolNoIdle) => {
                if attempt + 1 >= state.config.acquire_retry_attempts {
                    break;
                }
                tokio::time::sleep(state.config.acquire_retry_interval).await;
            }
            Err(e) => {
                report_server_error(state, e).await;
                return Err(());
            }
        }
    }
    warn!("exhausted acquire retries, no idle pooled client");
    Err(())
}

async fn release(state: &AppState, pooled: sfrodb_client::PooledClient<'_>, is_broken: bool) {
    let id = pooled.id().to_string();
    if let Err(e) = state.pool.release(pooled, is_broken).await {
        warn!(id, error = %e, "failed to release pooled client");
    }
}

async fn report_server_error(state: &AppState, err: CoreError) {
    debug!(error = %err, "forwarding server-class error to listener");
    let _ = state.server_errors.send(err).await;
}

fn success_response(config: &GatewayConfig, data: Vec<u8>) -> Response {
    let mut builder = Response::builder().status(StatusCode::OK).header(header::SERVER, "SFHS").header(
        header::CACHE_CONTROL,
        format!("max-age={}, must-revalidate", config.cache_max_age_sec),
    );

    builder = match HeaderValue::from_str(&config.mime_type) {
        Ok(v) => builder.header(header::CONTENT_TYPE, v),
        Err(_) => builder,
    };

    if let Some(origin) = &config.cors_origin {
        builder = match HeaderValue::from_str(origin) {
            Ok(v) => builder.header(header::ACCESS_CONTROL_ALLOW_ORIGIN, v),
            Err(_) => builder,
        };
    }

    match builder.body(Body::from(data)) {
        Ok(resp) => resp,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

fn client_error_response() -> Response {
    StatusCode::BAD_REQUEST.into_response()
}

fn server_error_response() -> Response {
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
