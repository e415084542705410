//! Gateway-level errors.

use thiserror::Error;

/// Errors raised while standing up or running the gateway itself, as
/// distinct from per-request [`sfrodb_core::CoreError`]s the backing
/// pool surfaces.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The HTTP listener failed to bind.
    #[error("failed to bind http listener: {0}")]
    Bind(std::io::Error),

    /// TLS was requested but the certificate or key could not be loaded.
    #[error("failed to load tls material: {0}")]
    Tls(std::io::Error),

    /// The backing client pool failed to start.
    #[error("client pool failed to start: {0}")]
    Pool(#[from] sfrodb_core::CoreError),
}
