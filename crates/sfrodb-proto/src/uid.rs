//! Opaque blob identifiers.

use std::fmt;

use crate::error::ProtocolError;

/// Maximum length of a [`Uid`], in bytes.
pub const MAX_LEN: usize = 255;

/// An opaque, validated blob identifier.
///
/// # Invariants
///
/// - Non-empty after trimming leading/trailing whitespace.
/// - At most [`MAX_LEN`] bytes long.
/// - Never contains `.` (prevents path traversal into parent directories
///   and disambiguates the key from the file extension appended by the
///   file store).
///
/// Equality is byte-exact on the trimmed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid(String);

impl Uid {
    /// Validate and wrap a raw key string.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::UidInvalid`] if, after trimming, the key is empty
    ///   or contains `.`.
    /// - [`ProtocolError::UidTooLong`] if the trimmed key exceeds
    ///   [`MAX_LEN`] bytes.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, ProtocolError> {
        let trimmed = raw.as_ref().trim();

        if trimmed.is_empty() || trimmed.contains('.') {
            return Err(ProtocolError::UidInvalid);
        }

        if trimmed.len() > MAX_LEN {
            return Err(ProtocolError::UidTooLong { len: trimmed.len() });
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the underlying key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of bytes the key occupies on the wire.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this key is empty. Always `false` for a validly parsed
    /// [`Uid`]; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Uid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn trims_whitespace() {
        assert_eq!(Uid::parse("  alpha  ").unwrap().as_str(), "alpha");
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(Uid::parse("   "), Err(ProtocolError::UidInvalid)));
    }

    #[test]
    fn rejects_dot() {
        assert!(matches!(Uid::parse("bad.key"), Err(ProtocolError::UidInvalid)));
        assert!(matches!(Uid::parse("../etc/passwd"), Err(ProtocolError::UidInvalid)));
    }

    #[test]
    fn rejects_too_long() {
        let long = "a".repeat(MAX_LEN + 1);
        assert!(matches!(Uid::parse(long), Err(ProtocolError::UidTooLong { .. })));
    }

    #[test]
    fn accepts_max_len() {
        let max = "a".repeat(MAX_LEN);
        assert!(Uid::parse(max).is_ok());
    }
}
