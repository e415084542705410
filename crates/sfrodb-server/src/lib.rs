//! The SFRODB two-port server core.
//!
//! `Server::bind` opens a main (read-only) and an aux (control) TCP
//! listener; `Server::run` spawns their accept loops, each spawning one
//! task per accepted connection.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dispatch;

use std::sync::Arc;

pub use config::ServerConfig;
use dispatch::{act_forget_record, act_reset_cache, act_search_file, act_search_record, act_show_data};
use sfrodb_core::{Cache, Connection, CoreError, FileStore};
use sfrodb_proto::{Method, Status};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct Shared {
    cache: Cache,
    files: FileStore,
}

/// The running two-port server.
pub struct Server {
    config: ServerConfig,
    main_listener: TcpListener,
    aux_listener: TcpListener,
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl Server {
    /// Open both listeners and build the cache/file-store backing them.
    ///
    /// # Errors
    ///
    /// [`CoreError::Transport`] if either listener fails to bind, or if
    /// the configured data folder does not exist.
    pub async fn bind(config: ServerConfig) -> Result<Self, CoreError> {
        let main_listener = TcpListener::bind(config.main_addr()).await.map_err(CoreError::Transport)?;
        let aux_listener = TcpListener::bind(config.aux_addr()).await.map_err(CoreError::Transport)?;

        let files = FileStore::new(config.data.clone()).await?;
        let cache = Cache::new(config.cache);

        Ok(Self {
            config,
            main_listener,
            aux_listener,
            shared: Arc::new(Shared { cache, files }),
            cancel: CancellationToken::new(),
        })
    }

    /// Local address of the main listener.
    ///
    /// # Errors
    ///
    /// [`CoreError::Transport`] if the OS cannot report the bound address.
    pub fn main_local_addr(&self) -> Result<std::net::SocketAddr, CoreError> {
        self.main_listener.local_addr().map_err(CoreError::Transport)
    }

    /// Local address of the aux listener.
    ///
    /// # Errors
    ///
    /// [`CoreError::Transport`] if the OS cannot report the bound address.
    pub fn aux_local_addr(&self) -> Result<std::net::SocketAddr, CoreError> {
        self.aux_listener.local_addr().map_err(CoreError::Transport)
    }

    /// A token that, once cancelled, unwinds both accept loops at their
    /// next iteration. Clone it before calling [`Server::run`] to trigger
    /// shutdown from elsewhere (e.g. a `ctrl_c` handler in `main`).
    #[must_use]
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run both accept loops until `shutdown_handle`'s token is cancelled.
    /// Never forcibly aborts an in-flight request: cancellation is only
    /// observed between accepts, and handler tasks already spawned run to
    /// completion on their own.
    pub async fn run(self) {
        info!(
            main = %self.main_local_addr().map(|a| a.to_string()).unwrap_or_default(),
            aux = %self.aux_local_addr().map(|a| a.to_string()).unwrap_or_default(),
            "server starting"
        );

        let main_task = accept_loop(self.main_listener, self.shared.clone(), self.cancel.clone(), Channel::Main);
        let aux_task = accept_loop(self.aux_listener, self.shared.clone(), self.cancel.clone(), Channel::Aux);

        tokio::join!(main_task, aux_task);
        info!("server stopped");
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Channel {
    Main,
    Aux,
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>, cancel: CancellationToken, channel: Channel) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        let shared = shared.clone();
                        let cancel = cancel.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, addr.to_string(), shared, cancel, channel).await;
                        });
                    }
                    Err(e) => error!(error = %e, "accept failed"),
                }
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, client_id: String, shared: Arc<Shared>, cancel: CancellationToken, channel: Channel) {
    let mut con = match Connection::from_tcp_stream(stream, 0, client_id.clone()) {
        Ok(con) => con,
        Err(e) => {
            error!(client_id, error = %e, "failed to configure accepted connection");
            return;
        }
    };

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            request = con.receive_request() => {
                let request = match request {
                    Ok(r) => r,
                    Err(e) if e.is_client_error() => {
                        debug!(client_id = %con.client_id(), error = %e, "malformed request, answering with client error");
                        if let Err(send_err) = con.send_response(Status::ClientError, &[]).await {
                            error!(client_id = %con.client_id(), error = %send_err, "failed to send client-error response");
                            break;
                        }
                        continue;
                    }
                    Err(e) => {
                        debug!(client_id = %con.client_id(), error = %e, "connection closed while reading request");
                        break;
                    }
                };

                if request.method == Method::CloseConnection {
                    break;
                }

                let outcome = dispatch(&shared, channel, request.method, request.uid.as_ref()).await;
                match outcome {
                    Ok((status, data)) => {
                        if let Err(e) = con.send_response(status, &data).await {
                            error!(client_id = %con.client_id(), error = %e, "failed to send response");
                            break;
                        }
                    }
                    Err(e) if e.is_client_error() => {
                        if let Err(send_err) = con.send_response(Status::ClientError, &[]).await {
                            error!(client_id = %con.client_id(), error = %send_err, "failed to send client-error response");
                            break;
                        }
                    }
                    Err(e) => {
                        error!(client_id = %con.client_id(), error = %e, "server-class error, closing connection");
                        break;
                    }
                }
            }
        }
    }

    finalize(&mut con).await;
}

async fn dispatch(
    shared: &Shared,
    channel: Channel,
    method: Method,
    uid: Option<&sfrodb_proto::Uid>,
) -> Result<(Status, Vec<u8>), CoreError> {
    match (channel, method) {
        (Channel::Main, Method::ShowData) => {
            act_show_data(&shared.cache, &shared.files, uid.ok_or(CoreError::UidInvalid)?).await
        }
        (Channel::Main, Method::SearchRecord) => {
            Ok(act_search_record(&shared.cache, uid.ok_or(CoreError::UidInvalid)?))
        }
        (Channel::Main, Method::SearchFile) => act_search_file(&shared.files, uid.ok_or(CoreError::UidInvalid)?).await,
        (Channel::Aux, Method::ForgetRecord) => {
            Ok(act_forget_record(&shared.cache, uid.ok_or(CoreError::UidInvalid)?))
        }
        (Channel::Aux, Method::ResetCache) => Ok(act_reset_cache(&shared.cache)),
        _ => Err(CoreError::UnsupportedMethod),
    }
}

async fn finalize(con: &mut Connection<TcpStream>) {
    if let Err(e) = con.send_response(Status::ClosingConnection, &[]).await {
        warn!(client_id = %con.client_id(), error = %e, "failed to send closing-connection notice");
    }
    if let Err(e) = con.close().await {
        if !matches!(e, CoreError::AlreadyClosed) {
            warn!(client_id = %con.client_id(), error = %e, "failed to close connection cleanly");
        }
    }
}
