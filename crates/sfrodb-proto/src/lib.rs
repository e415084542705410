//! SFRODB wire protocol.
//!
//! Two frame types share one stream: a [`Request`] (client to server) and a
//! [`Response`] (server to client). Both are strictly length-prefixed —
//! there are no delimiters or terminators. See [`method`] and [`status`] for
//! the closed verb/status vocabulary and [`frame`] for the codec.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod frame;
mod method;
mod status;
mod uid;

pub use error::ProtocolError;
pub use frame::{Request, Response, decode_request, decode_response, encode_request, encode_response};
pub use method::Method;
pub use status::Status;
pub use uid::{MAX_LEN, Uid};

/// Result alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
