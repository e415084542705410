//! Response status tokens.

use crate::error::ProtocolError;

/// A response status.
///
/// See [`Method`](crate::Method) for the mirror-image request vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// `SOK` — the mutation succeeded.
    Ok,
    /// `SER` — the caller's request was malformed or otherwise invalid;
    /// the connection stays open.
    ClientError,
    /// `SCC` — the server is about to close this connection.
    ClosingConnection,
    /// `SSD` — carries the requested blob.
    ShowingData,
    /// `SRE` — the key is present in the cache.
    RecordExists,
    /// `SRN` — the key is absent from the cache.
    RecordDoesNotExist,
    /// `SFE` — the key has a backing file on disk.
    FileExists,
    /// `SFN` — the key has no backing file on disk.
    FileDoesNotExist,
}

impl Status {
    /// Encode as the 3-byte ASCII token used on the wire.
    #[must_use]
    pub fn as_token(self) -> [u8; 3] {
        match self {
            Self::Ok => *b"SOK",
            Self::ClientError => *b"SER",
            Self::ClosingConnection => *b"SCC",
            Self::ShowingData => *b"SSD",
            Self::RecordExists => *b"SRE",
            Self::RecordDoesNotExist => *b"SRN",
            Self::FileExists => *b"SFE",
            Self::FileDoesNotExist => *b"SFN",
        }
    }

    /// Decode a 3-byte ASCII token.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownToken`] if `token` does not match any known
    /// status.
    pub fn from_token(token: [u8; 3]) -> Result<Self, ProtocolError> {
        match &token {
            b"SOK" => Ok(Self::Ok),
            b"SER" => Ok(Self::ClientError),
            b"SCC" => Ok(Self::ClosingConnection),
            b"SSD" => Ok(Self::ShowingData),
            b"SRE" => Ok(Self::RecordExists),
            b"SRN" => Ok(Self::RecordDoesNotExist),
            b"SFE" => Ok(Self::FileExists),
            b"SFN" => Ok(Self::FileDoesNotExist),
            _ => Err(ProtocolError::UnknownToken { token }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALL: [Status; 8] = [
        Status::Ok,
        Status::ClientError,
        Status::ClosingConnection,
        Status::ShowingData,
        Status::RecordExists,
        Status::RecordDoesNotExist,
        Status::FileExists,
        Status::FileDoesNotExist,
    ];

    #[test]
    fn token_roundtrip() {
        for s in ALL {
            assert_eq!(Status::from_token(s.as_token()).unwrap(), s);
        }
    }

    #[test]
    fn unknown_token_rejected() {
        assert!(matches!(Status::from_token(*b"???"), Err(ProtocolError::UnknownToken { .. })));
    }
}
