//! Request method tokens.

use crate::error::ProtocolError;

/// A request verb.
///
/// The wire representation is a fixed 3-byte ASCII token (see
/// [`Method::as_token`]); this is a closed, finite vocabulary, so the
/// token table is simply a `match`, which the compiler turns into an
/// equivalent jump table without runtime initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `CCC` — ask the peer to close this connection (main or aux).
    CloseConnection,
    /// `CSD` — fetch a blob (main channel only).
    ShowData,
    /// `CSR` — check cache membership (main channel only).
    SearchRecord,
    /// `CSF` — check on-disk presence (main channel only).
    SearchFile,
    /// `CFR` — evict a single cache entry (aux channel only).
    ForgetRecord,
    /// `CRC` — clear the whole cache (aux channel only).
    ResetCache,
}

impl Method {
    /// Encode as the 3-byte ASCII token used on the wire.
    #[must_use]
    pub fn as_token(self) -> [u8; 3] {
        match self {
            Self::CloseConnection => *b"CCC",
            Self::ShowData => *b"CSD",
            Self::SearchRecord => *b"CSR",
            Self::SearchFile => *b"CSF",
            Self::ForgetRecord => *b"CFR",
            Self::ResetCache => *b"CRC",
        }
    }

    /// Decode a 3-byte ASCII token.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownToken`] if `token` does not match any known
    /// method.
    pub fn from_token(token: [u8; 3]) -> Result<Self, ProtocolError> {
        match &token {
            b"CCC" => Ok(Self::CloseConnection),
            b"CSD" => Ok(Self::ShowData),
            b"CSR" => Ok(Self::SearchRecord),
            b"CSF" => Ok(Self::SearchFile),
            b"CFR" => Ok(Self::ForgetRecord),
            b"CRC" => Ok(Self::ResetCache),
            _ => Err(ProtocolError::UnknownToken { token }),
        }
    }

    /// Whether this verb is carried on the main (read-only) channel.
    #[must_use]
    pub fn is_main_channel(self) -> bool {
        matches!(self, Self::CloseConnection | Self::ShowData | Self::SearchRecord | Self::SearchFile)
    }

    /// Whether this verb is carried on the aux (control) channel.
    #[must_use]
    pub fn is_aux_channel(self) -> bool {
        matches!(self, Self::CloseConnection | Self::ForgetRecord | Self::ResetCache)
    }
}
