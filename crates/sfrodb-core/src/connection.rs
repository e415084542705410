//! A stream endpoint bound to the framing codec.

use std::sync::atomic::{AtomicBool, Ordering};

use sfrodb_proto::{Method, Request, Response, Status, Uid, decode_request, decode_response, encode_request, encode_response};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tracing::debug;

use crate::CoreError;

/// Enable TCP keep-alive with a 15 second period.
const KEEPALIVE_PERIOD_SECS: u64 = 15;

/// Couples a byte stream to the request/response codec.
///
/// `send_*` and `receive_*` on the same connection must not overlap: a
/// connection is a half-duplex pipe driven by one caller at a time. Many
/// connections run in parallel instead of multiplexing one.
pub struct Connection<S> {
    stream: S,
    /// Cap applied to `receive_response`'s frame size; `0` means
    /// unbounded. Only meaningful on the client side.
    max_response_len: u32,
    client_id: String,
    closed: AtomicBool,
}

impl<S> Connection<S> {
    /// The opaque identifier attached to this connection's log lines and
    /// errors.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Wrap an already-connected stream.
    pub fn new(stream: S, max_response_len: u32, client_id: impl Into<String>) -> Self {
        Self { stream, max_response_len, client_id: client_id.into(), closed: AtomicBool::new(false) }
    }

    /// Client side: send a request.
    ///
    /// `uid` is `None` for the unkeyed verbs (`ResetCache`,
    /// `CloseConnection`), producing a zero-length UID field.
    ///
    /// # Errors
    ///
    /// [`CoreError::Transport`] if the write fails, or a client-class
    /// error if `uid` fails validation at encode time.
    pub async fn send_request(&mut self, method: Method, uid: Option<&Uid>) -> Result<(), CoreError> {
        let bytes = encode_request(method, uid)?;
        use tokio::io::AsyncWriteExt;
        self.stream.write_all(&bytes).await.map_err(CoreError::Transport)
    }

    /// Client side: read the next response.
    ///
    /// # Errors
    ///
    /// Any [`CoreError`] variant [`sfrodb_proto::decode_response`] can
    /// produce, translated through `From<ProtocolError>`.
    pub async fn receive_response(&mut self) -> Result<Response, CoreError> {
        Ok(decode_response(&mut self.stream, self.max_response_len).await?)
    }

    /// Server side: read the next request.
    ///
    /// # Errors
    ///
    /// Any [`CoreError`] variant [`sfrodb_proto::decode_request`] can
    /// produce.
    pub async fn receive_request(&mut self) -> Result<Request, CoreError> {
        Ok(decode_request(&mut self.stream).await?)
    }

    /// Server side: send a response.
    ///
    /// # Errors
    ///
    /// [`CoreError::Transport`] if the write fails, or
    /// [`CoreError::MessageTooLong`] if `data` cannot be represented in
    /// the response frame's `u32` size field.
    pub async fn send_response(&mut self, status: Status, data: &[u8]) -> Result<(), CoreError> {
        let bytes = encode_response(status, data)?;
        use tokio::io::AsyncWriteExt;
        self.stream.write_all(&bytes).await.map_err(CoreError::Transport)
    }

    /// Close the underlying stream. Guaranteed single-shot: a second call
    /// returns [`CoreError::AlreadyClosed`] rather than re-closing or
    /// panicking.
    ///
    /// # Errors
    ///
    /// [`CoreError::AlreadyClosed`] if already closed;
    /// [`CoreError::Transport`] if the shutdown itself fails.
    pub async fn close(&mut self) -> Result<(), CoreError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(CoreError::AlreadyClosed);
        }

        use tokio::io::AsyncWriteExt;
        self.stream.shutdown().await.map_err(CoreError::Transport)?;
        debug!(client_id = %self.client_id, "connection closed");
        Ok(())
    }
}

impl Connection<TcpStream> {
    /// Wrap a [`TcpStream`], enabling keep-alive.
    ///
    /// # Errors
    ///
    /// [`CoreError::Transport`] if the socket options cannot be applied.
    pub fn from_tcp_stream(
        stream: TcpStream,
        max_response_len: u32,
        client_id: impl Into<String>,
    ) -> Result<Self, CoreError> {
        configure_keepalive(&stream)?;
        Ok(Self::new(stream, max_response_len, client_id))
    }
}

fn configure_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    let sock_ref = socket2::SockRef::from(stream);
    let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(KEEPALIVE_PERIOD_SECS));
    sock_ref.set_tcp_keepalive(&keepalive)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::io::duplex;

    use super::*;

    #[tokio::test]
    async fn request_response_roundtrip_over_duplex() {
        let (client_io, server_io) = duplex(4096);
        let mut client = Connection::new(client_io, 0, "client-1");
        let mut server = Connection::new(server_io, 0, "server-1");

        let uid = Uid::parse("alpha").unwrap();
        client.send_request(Method::ShowData, Some(&uid)).await.unwrap();

        let req = server.receive_request().await.unwrap();
        assert_eq!(req.method, Method::ShowData);
        assert_eq!(req.uid, Some(uid));

        server.send_response(Status::ShowingData, b"hello").await.unwrap();
        let resp = client.receive_response().await.unwrap();
        assert_eq!(resp.status, Status::ShowingData);
        assert_eq!(resp.data, b"hello");
    }

    #[tokio::test]
    async fn second_close_is_already_closed() {
        let (client_io, _server_io) = duplex(64);
        let mut client = Connection::new(client_io, 0, "client-1");
        client.close().await.unwrap();
        let err = client.close().await.unwrap_err();
        assert!(matches!(err, CoreError::AlreadyClosed));
    }
}
