//! Shared building blocks for the SFRODB server and client: key-bound file
//! access, the bounded cache, the transport-facing [`Connection`] type, and
//! the error taxonomy both sides share.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod connection;
mod error;
mod file_store;

pub use cache::{Cache, CacheConfig};
pub use connection::Connection;
pub use error::CoreError;
pub use file_store::{DataConfig, FileStore};
pub use sfrodb_proto::Uid;

/// Result alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, CoreError>;
