//! Client core: two connections (main, aux) plus a start/stop/restart
//! latch.

use sfrodb_core::{Connection, CoreError, Uid};
use sfrodb_proto::{Method, Response, Status};
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;

/// Connection settings for a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server host.
    pub host: String,
    /// Main (read-only) channel port.
    pub main_port: u16,
    /// Aux (control) channel port.
    pub aux_port: u16,
    /// Cap on response frame size; `0` means unbounded. Defaults to
    /// 1,000,000.
    pub response_message_length_limit: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), main_port: 13260, aux_port: 13261, response_message_length_limit: 1_000_000 }
    }
}

impl ClientConfig {
    fn main_dsn(&self) -> String {
        format!("{}:{}", self.host, self.main_port)
    }

    fn aux_dsn(&self) -> String {
        format!("{}:{}", self.host, self.aux_port)
    }
}

struct Connections {
    main: Connection<TcpStream>,
    aux: Connection<TcpStream>,
}

/// A client owning a main and an aux connection to one server.
///
/// `start`/`stop`/`restart` are serialized by an internal async mutex
/// guarding the start-stop transition; [`Client::is_working`] reports
/// whether a connection pair is currently live.
pub struct Client {
    id: String,
    config: ClientConfig,
    latch: AsyncMutex<()>,
    connections: AsyncMutex<Option<Connections>>,
}

impl Client {
    /// Build a client for `config`, not yet connected. Call
    /// [`Client::start`] before issuing requests.
    #[must_use]
    pub fn new(config: ClientConfig, id: impl Into<String>) -> Self {
        Self { id: id.into(), config, latch: AsyncMutex::new(()), connections: AsyncMutex::new(None) }
    }

    /// This client's identifier, used in logs and pool bookkeeping.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether `start` has succeeded without a matching `stop`.
    pub async fn is_working(&self) -> bool {
        self.connections.lock().await.is_some()
    }

    /// Dial both connections.
    ///
    /// # Errors
    ///
    /// [`CoreError::DoubleStart`] if already working. Dialing failures
    /// surface as [`CoreError::Transport`].
    pub async fn start(&self) -> Result<(), CoreError> {
        let _guard = self.latch.lock().await;
        let mut connections = self.connections.lock().await;
        if connections.is_some() {
            return Err(CoreError::DoubleStart);
        }

        let main_stream = TcpStream::connect(self.config.main_dsn()).await.map_err(CoreError::Transport)?;
        let main =
            Connection::from_tcp_stream(main_stream, self.config.response_message_length_limit, self.id.clone())?;

        let aux_stream = TcpStream::connect(self.config.aux_dsn()).await.map_err(CoreError::Transport)?;
        let aux =
            Connection::from_tcp_stream(aux_stream, self.config.response_message_length_limit, self.id.clone())?;

        *connections = Some(Connections { main, aux });
        Ok(())
    }

    /// Close both connections.
    ///
    /// # Errors
    ///
    /// [`CoreError::DoubleStop`] if not currently working.
    pub async fn stop(&self) -> Result<(), CoreError> {
        let _guard = self.latch.lock().await;
        let mut connections = self.connections.lock().await;
        let Some(mut conns) = connections.take() else {
            return Err(CoreError::DoubleStop);
        };

        let main_result = conns.main.close().await;
        let aux_result = conns.aux.close().await;
        main_result?;
        aux_result?;
        Ok(())
    }

    /// Stop then start. `force = true` ignores a failed stop (best
    /// effort); `force = false` requires a clean stop before restarting.
    ///
    /// # Errors
    ///
    /// Whatever [`Client::start`] or [`Client::stop`] return.
    pub async fn restart(&self, force: bool) -> Result<(), CoreError> {
        if force {
            let _ = self.stop().await;
        } else {
            self.stop().await?;
        }
        self.start().await
    }

    async fn roundtrip_main(&self, method: Method, uid: Option<&Uid>) -> Result<Response, CoreError> {
        let mut guard = self.connections.lock().await;
        let conns = guard.as_mut().ok_or(CoreError::NotWorking)?;
        conns.main.send_request(method, uid).await?;
        conns.main.receive_response().await
    }

    async fn roundtrip_aux(&self, method: Method, uid: Option<&Uid>) -> Result<Response, CoreError> {
        let mut guard = self.connections.lock().await;
        let conns = guard.as_mut().ok_or(CoreError::NotWorking)?;
        conns.aux.send_request(method, uid).await?;
        conns.aux.receive_response().await
    }

    /// Fetch a blob by key.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotWorking`] if not started; [`CoreError::NotFound`]
    /// if the server reports a client error; [`CoreError::UnexpectedServer`]
    /// if the response status is neither `ShowingData` nor `ClientError`.
    pub async fn show_data(&self, uid: &Uid) -> Result<Vec<u8>, CoreError> {
        let resp = self.roundtrip_main(Method::ShowData, Some(uid)).await?;
        match resp.status {
            Status::ShowingData => Ok(resp.data),
            Status::ClientError => Err(CoreError::NotFound),
            other => Err(CoreError::UnexpectedServer { status: other }),
        }
    }

    /// Check cache membership for `uid`.
    ///
    /// # Errors
    ///
    /// See [`Client::show_data`].
    pub async fn search_record(&self, uid: &Uid) -> Result<bool, CoreError> {
        let resp = self.roundtrip_main(Method::SearchRecord, Some(uid)).await?;
        match resp.status {
            Status::RecordExists => Ok(true),
            Status::RecordDoesNotExist => Ok(false),
            other => Err(CoreError::UnexpectedServer { status: other }),
        }
    }

    /// Check on-disk presence for `uid`.
    ///
    /// # Errors
    ///
    /// See [`Client::show_data`].
    pub async fn search_file(&self, uid: &Uid) -> Result<bool, CoreError> {
        let resp = self.roundtrip_main(Method::SearchFile, Some(uid)).await?;
        match resp.status {
            Status::FileExists => Ok(true),
            Status::FileDoesNotExist => Ok(false),
            other => Err(CoreError::UnexpectedServer { status: other }),
        }
    }

    /// Evict `uid` from the server's cache.
    ///
    /// # Errors
    ///
    /// See [`Client::show_data`].
    pub async fn forget_record(&self, uid: &Uid) -> Result<(), CoreError> {
        expect_ok(&self.roundtrip_aux(Method::ForgetRecord, Some(uid)).await?)
    }

    /// Clear the server's whole cache.
    ///
    /// # Errors
    ///
    /// See [`Client::show_data`].
    pub async fn reset_cache(&self) -> Result<(), CoreError> {
        expect_ok(&self.roundtrip_aux(Method::ResetCache, None).await?)
    }

    /// Ask the server to close the main connection.
    ///
    /// If `normal_exit`, waits for the matching `ClosingConnection`
    /// acknowledgement; otherwise sends and returns immediately (error
    /// path, no wait).
    ///
    /// # Errors
    ///
    /// See [`Client::show_data`].
    pub async fn close_connection_main(&self, normal_exit: bool) -> Result<(), CoreError> {
        let mut guard = self.connections.lock().await;
        let conns = guard.as_mut().ok_or(CoreError::NotWorking)?;
        conns.main.send_request(Method::CloseConnection, None).await?;
        if !normal_exit {
            return Ok(());
        }
        expect_closing(&conns.main.receive_response().await?)
    }

    /// Ask the server to close the aux connection. See
    /// [`Client::close_connection_main`] for `normal_exit` semantics.
    ///
    /// # Errors
    ///
    /// See [`Client::show_data`].
    pub async fn close_connection_aux(&self, normal_exit: bool) -> Result<(), CoreError> {
        let mut guard = self.connections.lock().await;
        let conns = guard.as_mut().ok_or(CoreError::NotWorking)?;
        conns.aux.send_request(Method::CloseConnection, None).await?;
        if !normal_exit {
            return Ok(());
        }
        expect_closing(&conns.aux.receive_response().await?)
    }
}

fn expect_ok(resp: &Response) -> Result<(), CoreError> {
    if resp.status == Status::Ok { Ok(()) } else { Err(CoreError::UnexpectedServer { status: resp.status }) }
}

fn expect_closing(resp: &Response) -> Result<(), CoreError> {
    if resp.status == Status::ClosingConnection {
        Ok(())
    } else {
        Err(CoreError::UnexpectedServer { status: resp.status })
    }
}
