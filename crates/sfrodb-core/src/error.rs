//! Shared client/server error taxonomy.
//!
//! Every fallible operation in this crate and in `sfrodb-server` /
//! `sfrodb-client` returns a [`CoreError`]. Its [`CoreError::is_client_error`]
//! / [`CoreError::is_server_error`] predicates are what the server's
//! dispatch loop and the HTTP gateway use to decide whether a connection
//! survives a failure or gets torn down.

use sfrodb_proto::{ProtocolError, Status};
use thiserror::Error;

/// An error raised anywhere in the connection, file-store, or cache layer.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The underlying stream failed, or a frame was malformed in a way
    /// that makes the stream unrecoverable (the peer's framing cannot be
    /// trusted after this).
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A response frame claimed fewer than 3 bytes of payload.
    #[error("frame too short: {0}")]
    FrameTooShort(String),

    /// A decoded response exceeded the caller-supplied length cap.
    #[error("message too long: {0}")]
    MessageTooLong(String),

    /// A method or status token did not match any entry in the vocabulary.
    #[error("unknown token: {0}")]
    UnknownToken(String),

    /// A UID was empty after trimming or contained `.`.
    #[error("invalid uid")]
    UidInvalid,

    /// A UID exceeded the maximum length.
    #[error("uid too long")]
    UidTooLong,

    /// A verb arrived on the wrong channel, or is not part of the
    /// vocabulary at all.
    #[error("unsupported method on this channel")]
    UnsupportedMethod,

    /// The requested key has no backing file.
    #[error("not found")]
    NotFound,

    /// A resolved file-store path escaped the configured base directory.
    #[error("invalid path")]
    InvalidPath,

    /// `Cache::put` could not make room even after evicting every eligible
    /// entry. Treated as non-fatal by every caller; the blob is still
    /// served, just not cached.
    #[error("no room in cache")]
    CacheNoRoom,

    /// `Connection::close` was called on an already-closed connection.
    #[error("connection already closed")]
    AlreadyClosed,

    /// A response status was not one of the statuses valid for the verb
    /// that produced it.
    #[error("unexpected status {status:?} from server")]
    UnexpectedServer {
        /// The status actually received.
        status: Status,
    },

    /// `Client::start` was called on a client that is already working.
    #[error("client already started")]
    DoubleStart,

    /// `Client::stop` was called on a client that is not working.
    #[error("client already stopped")]
    DoubleStop,

    /// An action method was called before `Client::start` (or after
    /// `Client::stop`).
    #[error("client is not started")]
    NotWorking,

    /// `ClientPool::acquire` found no idle client.
    #[error("no idle client available")]
    PoolNoIdle,

    /// `ClientPool::new` was given two clients sharing an id.
    #[error("duplicate client id {0:?}")]
    PoolDuplicateClientId(String),

    /// `ClientPool::release` was called with a client the pool does not
    /// consider in use.
    #[error("client {0:?} is not in use")]
    PoolClientNotInUse(String),
}

impl CoreError {
    /// Whether this error is the caller's fault: the connection survives
    /// and the server should reply `ClientError` and keep looping.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UidInvalid
                | Self::UidTooLong
                | Self::UnsupportedMethod
                | Self::NotFound
                | Self::InvalidPath
        )
    }

    /// Whether this error is the server's (or the transport's) fault: the
    /// connection cannot continue and must be finalized.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
            && !matches!(
                self,
                Self::CacheNoRoom
                    | Self::AlreadyClosed
                    | Self::DoubleStart
                    | Self::DoubleStop
                    | Self::NotWorking
                    | Self::PoolNoIdle
                    | Self::PoolDuplicateClientId(_)
                    | Self::PoolClientNotInUse(_)
            )
    }
}

impl From<ProtocolError> for CoreError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(e) => Self::Transport(e),
            ProtocolError::FrameTooShort { size } => Self::FrameTooShort(format!("size {size}")),
            ProtocolError::MessageTooLong { size, max } => {
                Self::MessageTooLong(format!("size {size} exceeds cap {max}"))
            }
            ProtocolError::UnknownToken { token } => {
                Self::UnknownToken(format!("{token:?}"))
            }
            ProtocolError::UidInvalid => Self::UidInvalid,
            ProtocolError::UidTooLong { .. } => Self::UidTooLong,
            ProtocolError::ContentTooLong { .. } => Self::MessageTooLong("content too long".into()),
        }
    }
}
