//! Protocol-level errors.
//!
//! These are the errors that can occur while encoding or decoding frames,
//! independent of the transport carrying them. Connection- and server-level
//! code (in `sfrodb-core` and `sfrodb-server`) wraps these into the broader
//! client/server error taxonomy.

use thiserror::Error;

/// Errors raised by frame encoding, decoding, and key validation.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A request or response frame claimed fewer than 3 bytes of payload,
    /// which is not enough to hold a method or status token.
    #[error("frame too short: size {size} is below the minimum of 3")]
    FrameTooShort {
        /// The `size` field read from the wire.
        size: u32,
    },

    /// A decoded response exceeded the caller-supplied length cap.
    #[error("message too long: size {size} exceeds the cap of {max}")]
    MessageTooLong {
        /// The `size` field read from the wire.
        size: u32,
        /// The cap supplied by the caller.
        max: u32,
    },

    /// A 3-byte method or status token did not match any entry in the
    /// vocabulary.
    #[error("unknown token: {token:?}")]
    UnknownToken {
        /// The raw, space-padded 3-byte token.
        token: [u8; 3],
    },

    /// A UID was empty (after trimming) or contained a `.`.
    #[error("uid is invalid: empty or contains '.'")]
    UidInvalid,

    /// A UID exceeded [`crate::MAX_LEN`] bytes, or a request's UID would
    /// make the request frame's `size` field overflow `u16`.
    #[error("uid too long: {len} bytes")]
    UidTooLong {
        /// The offending length, in bytes.
        len: usize,
    },

    /// A response's `data` payload exceeded `2^32 - 4` bytes and cannot be
    /// represented in the response frame's `u32` size field.
    #[error("content too long: {len} bytes")]
    ContentTooLong {
        /// The offending length, in bytes.
        len: usize,
    },

    /// The underlying stream failed while sending or receiving a frame.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}
