//! Frame encoding/decoding.
//!
//! ```text
//! Request  (client -> server): size:u16 BE | method: 3 bytes ASCII | uid: size-3 bytes
//! Response (server -> client): size:u32 BE | status: 3 bytes ASCII | data: size-3 bytes
//! ```
//!
//! Both frames are strictly length-prefixed; there are no delimiters or
//! terminators. `encode_*` are pure functions producing a byte buffer;
//! `decode_*` read directly off an async stream, since a frame cannot be
//! validated until its length-prefix and body have both arrived.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Method, ProtocolError, Status, Uid};

/// Maximum length of a request's UID once the 3-byte method token and the
/// `u16` size field are accounted for.
const MAX_REQUEST_UID_LEN: usize = u16::MAX as usize - 3;

/// Maximum length of a response's `data` payload (`2^32 - 4`).
const MAX_RESPONSE_DATA_LEN: usize = u32::MAX as usize - 4;

/// A decoded request frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The request verb.
    pub method: Method,
    /// The validated, trimmed key the verb applies to; `None` for a
    /// zero-length UID field, which is how `ResetCache` and
    /// `CloseConnection` are sent since neither verb is keyed.
    pub uid: Option<Uid>,
}

/// A decoded response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The response status.
    pub status: Status,
    /// The payload; empty for every status except [`Status::ShowingData`].
    pub data: Vec<u8>,
}

/// Encode a request frame.
///
/// `uid` is `None` for verbs that carry no key (`ResetCache`,
/// `CloseConnection`), producing a zero-length UID field (`size == 3`),
/// which the wire format explicitly permits.
///
/// # Errors
///
/// [`ProtocolError::UidTooLong`] if `uid` is longer than `u16::MAX - 3`
/// bytes (this cannot happen for a [`Uid`] obtained through
/// [`Uid::parse`], whose own 255-byte limit is far smaller, but a caller
/// could in principle construct one differently in a future version of
/// this crate).
pub fn encode_request(method: Method, uid: Option<&Uid>) -> Result<Vec<u8>, ProtocolError> {
    let uid_bytes = uid.map_or("", Uid::as_str).as_bytes();

    if uid_bytes.len() > MAX_REQUEST_UID_LEN {
        return Err(ProtocolError::UidTooLong { len: uid_bytes.len() });
    }

    #[allow(clippy::cast_possible_truncation)]
    let size = (3 + uid_bytes.len()) as u16;

    let mut buf = Vec::with_capacity(2 + size as usize);
    buf.extend_from_slice(&size.to_be_bytes());
    buf.extend_from_slice(&method.as_token());
    buf.extend_from_slice(uid_bytes);
    Ok(buf)
}

/// Read and decode a request frame from `stream`.
///
/// A UID field that is empty (or all whitespace) decodes to `uid: None`
/// rather than an error — the wire format's `size == 3` case, used by
/// `ResetCache` and `CloseConnection`, which carry no key.
///
/// # Errors
///
/// - [`ProtocolError::Io`] if the stream fails or closes mid-frame.
/// - [`ProtocolError::FrameTooShort`] if `size < 3`.
/// - [`ProtocolError::UnknownToken`] if the method token is not recognized.
/// - [`ProtocolError::UidInvalid`] if a non-empty UID contains `.`, or is
///   not valid UTF-8.
pub async fn decode_request<R: AsyncRead + Unpin>(stream: &mut R) -> Result<Request, ProtocolError> {
    let mut size_buf = [0u8; 2];
    stream.read_exact(&mut size_buf).await?;
    let size = u16::from_be_bytes(size_buf);

    if (size as usize) < 3 {
        return Err(ProtocolError::FrameTooShort { size: u32::from(size) });
    }

    let mut body = vec![0u8; size as usize];
    stream.read_exact(&mut body).await?;

    let mut method_token = [0u8; 3];
    method_token.copy_from_slice(&body[0..3]);
    let method = Method::from_token(method_token)?;

    let uid_str = std::str::from_utf8(&body[3..]).map_err(|_| ProtocolError::UidInvalid)?;
    let uid = if uid_str.trim().is_empty() { None } else { Some(Uid::parse(uid_str)?) };

    Ok(Request { method, uid })
}

/// Encode a response frame.
///
/// # Errors
///
/// [`ProtocolError::ContentTooLong`] if `data.len() > 2^32 - 4`.
pub fn encode_response(status: Status, data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if data.len() > MAX_RESPONSE_DATA_LEN {
        return Err(ProtocolError::ContentTooLong { len: data.len() });
    }

    #[allow(clippy::cast_possible_truncation)]
    let size = (3 + data.len()) as u32;

    let mut buf = Vec::with_capacity(4 + size as usize);
    buf.extend_from_slice(&size.to_be_bytes());
    buf.extend_from_slice(&status.as_token());
    buf.extend_from_slice(data);
    Ok(buf)
}

/// Read and decode a response frame from `stream`.
///
/// `max_len` caps the accepted `size` field as a client-side defense
/// against a misbehaving or compromised server claiming an enormous
/// frame; pass `0` to accept any size representable in `u32`.
///
/// # Errors
///
/// - [`ProtocolError::Io`] if the stream fails or closes mid-frame.
/// - [`ProtocolError::MessageTooLong`] if `size > max_len` (and `max_len
///   != 0`).
/// - [`ProtocolError::FrameTooShort`] if `size < 3`.
/// - [`ProtocolError::UnknownToken`] if the status token is not
///   recognized.
pub async fn decode_response<R: AsyncRead + Unpin>(
    stream: &mut R,
    max_len: u32,
) -> Result<Response, ProtocolError> {
    let mut size_buf = [0u8; 4];
    stream.read_exact(&mut size_buf).await?;
    let size = u32::from_be_bytes(size_buf);

    if max_len != 0 && size > max_len {
        return Err(ProtocolError::MessageTooLong { size, max: max_len });
    }

    if size < 3 {
        return Err(ProtocolError::FrameTooShort { size });
    }

    let mut body = vec![0u8; size as usize];
    stream.read_exact(&mut body).await?;

    let mut status_token = [0u8; 3];
    status_token.copy_from_slice(&body[0..3]);
    let status = Status::from_token(status_token)?;

    let data = body[3..].to_vec();

    Ok(Response { status, data })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;
    use tokio::io::{AsyncWriteExt, duplex};

    use super::*;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
    }

    #[test]
    fn request_roundtrip() {
        let rt = runtime();
        rt.block_on(async {
            let uid = Uid::parse("alpha").unwrap();
            let encoded = encode_request(Method::ShowData, Some(&uid)).unwrap();
            assert_eq!(encoded.len(), 3 + uid.len() + 2);

            let (mut client, mut server) = duplex(64);
            client.write_all(&encoded).await.unwrap();
            drop(client);

            let decoded = decode_request(&mut server).await.unwrap();
            assert_eq!(decoded.method, Method::ShowData);
            assert_eq!(decoded.uid, Some(uid));
        });
    }

    #[test]
    fn request_with_no_uid_roundtrips_to_none() {
        let rt = runtime();
        rt.block_on(async {
            let encoded = encode_request(Method::ResetCache, None).unwrap();
            assert_eq!(encoded.len(), 2 + 3);

            let (mut client, mut server) = duplex(64);
            client.write_all(&encoded).await.unwrap();
            drop(client);

            let decoded = decode_request(&mut server).await.unwrap();
            assert_eq!(decoded.method, Method::ResetCache);
            assert_eq!(decoded.uid, None);
        });
    }

    #[test]
    fn whitespace_only_uid_decodes_to_none() {
        let rt = runtime();
        rt.block_on(async {
            let mut body = Vec::new();
            body.extend_from_slice(&5u16.to_be_bytes());
            body.extend_from_slice(&Method::CloseConnection.as_token());
            body.extend_from_slice(b"  ");

            let (mut client, mut server) = duplex(64);
            client.write_all(&body).await.unwrap();
            drop(client);

            let decoded = decode_request(&mut server).await.unwrap();
            assert_eq!(decoded.method, Method::CloseConnection);
            assert_eq!(decoded.uid, None);
        });
    }

    #[test]
    fn response_roundtrip() {
        let rt = runtime();
        rt.block_on(async {
            let data = b"hello".to_vec();
            let encoded = encode_response(Status::ShowingData, &data).unwrap();
            assert_eq!(encoded.len(), 4 + 3 + data.len());

            let (mut client, mut server) = duplex(64);
            server.write_all(&encoded).await.unwrap();
            drop(server);

            let decoded = decode_response(&mut client, 0).await.unwrap();
            assert_eq!(decoded.status, Status::ShowingData);
            assert_eq!(decoded.data, data);
        });
    }

    #[test]
    fn frame_too_short_request() {
        let rt = runtime();
        rt.block_on(async {
            let (mut client, mut server) = duplex(64);
            client.write_all(&[0u8, 2]).await.unwrap();
            drop(client);
            let err = decode_request(&mut server).await.unwrap_err();
            assert!(matches!(err, ProtocolError::FrameTooShort { size: 2 }));
        });
    }

    #[test]
    fn message_too_long_is_enforced_client_side() {
        let rt = runtime();
        rt.block_on(async {
            let encoded = encode_response(Status::Ok, &[0u8; 100]).unwrap();
            let (mut client, mut server) = duplex(256);
            server.write_all(&encoded).await.unwrap();
            drop(server);

            let err = decode_response(&mut client, 10).await.unwrap_err();
            assert!(matches!(err, ProtocolError::MessageTooLong { .. }));
        });
    }

    #[test]
    fn uid_with_dot_rejected_at_encode() {
        assert!(Uid::parse("bad.key").is_err());
    }

    proptest! {
        #[test]
        fn uid_roundtrips_through_request(s in "[a-zA-Z0-9_-]{1,64}") {
            let uid = Uid::parse(&s).unwrap();
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                let encoded = encode_request(Method::ShowData, Some(&uid)).unwrap();
                let (mut c, mut srv) = duplex(4096);
                c.write_all(&encoded).await.unwrap();
                drop(c);
                let decoded = decode_request(&mut srv).await.unwrap();
                prop_assert_eq!(decoded.uid, Some(uid));
                Ok(())
            }).unwrap();
        }
    }
}
