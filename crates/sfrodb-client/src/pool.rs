//! A fixed-size pool of [`Client`]s with idle/used/broken/stopped
//! partitions and a background restarter.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use sfrodb_core::CoreError;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::client::{Client, ClientConfig};

/// Pause after a successful restart attempt.
const RESTARTER_SUCCESS_PAUSE: Duration = Duration::from_secs(5);
/// Pause after a failed restart attempt.
const RESTARTER_FAILURE_PAUSE: Duration = Duration::from_secs(15);

struct Partitions {
    idle: VecDeque<String>,
    used: HashSet<String>,
    broken: VecDeque<String>,
    stopped: VecDeque<String>,
}

/// A pool of clients, all dialing the same server, partitioned by
/// current state. Clients themselves never move; only their id's
/// partition membership changes, guarded by one transfer lock so the
/// whole checkout/return/restart state machine is linearizable.
pub struct ClientPool {
    clients: HashMap<String, Client>,
    partitions: AsyncMutex<Partitions>,
    cancel: CancellationToken,
    restarter: AsyncMutex<Option<JoinHandle<()>>>,
}

/// A client checked out of a [`ClientPool`]. Borrowed, not owned: call
/// [`ClientPool::release`] with this guard's id when done, instead of an
/// automatic `Drop` (async cleanup cannot run in a synchronous `Drop`
/// impl, so release is explicit here).
pub struct PooledClient<'a> {
    client: &'a Client,
    id: String,
}

impl PooledClient<'_> {
    /// The id of the checked-out client, to pass back to
    /// [`ClientPool::release`].
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::ops::Deref for PooledClient<'_> {
    type Target = Client;

    fn deref(&self) -> &Client {
        self.client
    }
}

impl ClientPool {
    /// Build a pool of `size` clients against one server, each with a
    /// distinct id ("1".."size"). All clients start in the `stopped`
    /// partition; call [`ClientPool::start`] to dial them.
    #[must_use]
    pub fn new(size: usize, config: ClientConfig) -> Self {
        let mut clients = HashMap::with_capacity(size);
        let mut stopped = VecDeque::with_capacity(size);
        for i in 1..=size {
            let id = i.to_string();
            clients.insert(id.clone(), Client::new(config.clone(), id.clone()));
            stopped.push_back(id);
        }

        Self {
            clients,
            partitions: AsyncMutex::new(Partitions {
                idle: VecDeque::new(),
                used: HashSet::new(),
                broken: VecDeque::new(),
                stopped,
            }),
            cancel: CancellationToken::new(),
            restarter: AsyncMutex::new(None),
        }
    }

    /// Dial every client and spawn the background restarter.
    ///
    /// # Errors
    ///
    /// Whatever [`Client::start`] returns on the first client that fails;
    /// every client dialed before the failure is stopped again and
    /// returned to `stopped`, leaving the pool in its pre-call state.
    pub async fn start(self: &Arc<Self>) -> Result<(), CoreError> {
        let mut partitions = self.partitions.lock().await;
        let ids: Vec<String> = partitions.stopped.drain(..).collect();

        for id in &ids {
            if let Some(client) = self.clients.get(id) {
                if let Err(e) = client.start().await {
                    for started_id in &ids {
                        if started_id == id {
                            break;
                        }
                        if let Some(started) = self.clients.get(started_id) {
                            let _ = started.stop().await;
                        }
                    }
                    partitions.stopped.extend(ids);
                    return Err(e);
                }
            }
        }

        partitions.idle.extend(ids);
        drop(partitions);

        let pool = Arc::clone(self);
        let handle = tokio::spawn(async move { pool.restarter_loop().await });
        *self.restarter.lock().await = Some(handle);

        info!(size = self.clients.len(), "client pool started");
        Ok(())
    }

    async fn restarter_loop(self: Arc<Self>) {
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let restarted = self.restart_one_broken().await;
            let pause = if restarted { RESTARTER_SUCCESS_PAUSE } else { RESTARTER_FAILURE_PAUSE };

            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(pause) => {}
            }
        }
        info!("client pool restarter stopped");
    }

    /// Pops one broken client and tries to restart it. Returns `true` if
    /// there was nothing to do, or the restart succeeded; `false` only on
    /// a failed restart attempt, so the restarter doesn't busy-loop on an
    /// empty broken set.
    async fn restart_one_broken(&self) -> bool {
        let mut partitions = self.partitions.lock().await;
        let Some(id) = partitions.broken.pop_front() else {
            return true;
        };

        let Some(client) = self.clients.get(&id) else {
            return true;
        };

        info!(id = %id, "reconnecting broken client");
        let _ = client.stop().await;
        match client.start().await {
            Ok(()) => {
                partitions.idle.push_back(id);
                info!("broken client reconnected");
                true
            }
            Err(_) => {
                partitions.broken.push_back(id);
                false
            }
        }
    }

    /// Check out one idle client.
    ///
    /// # Errors
    ///
    /// [`CoreError::PoolNoIdle`] if the idle partition is empty;
    /// [`CoreError::PoolDuplicateClientId`] if the chosen id is already
    /// checked out (an invariant violation, kept as a defensive check).
    pub async fn acquire(&self) -> Result<PooledClient<'_>, CoreError> {
        let mut partitions = self.partitions.lock().await;
        let id = partitions.idle.pop_front().ok_or(CoreError::PoolNoIdle)?;

        if !partitions.used.insert(id.clone()) {
            partitions.idle.push_back(id.clone());
            return Err(CoreError::PoolDuplicateClientId(id));
        }

        let client = self.clients.get(&id).ok_or_else(|| CoreError::PoolDuplicateClientId(id.clone()))?;
        Ok(PooledClient { client, id })
    }

    /// Return a checked-out client. `is_broken` routes it to the broken
    /// partition (for the restarter to retry) instead of back to idle.
    ///
    /// # Errors
    ///
    /// [`CoreError::PoolClientNotInUse`] if `pooled`'s id is not
    /// currently checked out (should not happen for a guard obtained from
    /// [`ClientPool::acquire`] on this same pool).
    pub async fn release(&self, pooled: PooledClient<'_>, is_broken: bool) -> Result<(), CoreError> {
        let mut partitions = self.partitions.lock().await;
        if !partitions.used.remove(&pooled.id) {
            return Err(CoreError::PoolClientNotInUse(pooled.id));
        }

        if is_broken {
            partitions.broken.push_back(pooled.id);
        } else {
            partitions.idle.push_back(pooled.id);
        }
        Ok(())
    }

    /// Number of clients in the pool, regardless of partition.
    #[must_use]
    pub fn size(&self) -> usize {
        self.clients.len()
    }

    /// Stop every client, drain all partitions into `stopped`, and join
    /// the background restarter.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let mut partitions = self.partitions.lock().await;
        info!("stopping all pooled clients");

        for id in partitions.idle.drain(..).collect::<Vec<_>>() {
            self.stop_and_park(&mut partitions.stopped, &id).await;
        }
        for id in partitions.used.drain().collect::<Vec<_>>() {
            self.stop_and_park(&mut partitions.stopped, &id).await;
        }
        for id in partitions.broken.drain(..).collect::<Vec<_>>() {
            self.stop_and_park(&mut partitions.stopped, &id).await;
        }
        drop(partitions);

        if let Some(handle) = self.restarter.lock().await.take() {
            let _ = handle.await;
        }

        info!("client pool stopped");
    }

    async fn stop_and_park(&self, stopped: &mut VecDeque<String>, id: &str) {
        if let Some(client) = self.clients.get(id) {
            let _ = client.stop().await;
        }
        stopped.push_back(id.to_string());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sfrodb_core::{CacheConfig, DataConfig, Uid};
    use sfrodb_server::{Server, ServerConfig};
    use tempfile::tempdir;

    use super::*;

    async fn running_server() -> (Server, u16, u16, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("alpha.dat"), b"hello").await.unwrap();

        let config = ServerConfig {
            host: "127.0.0.1".into(),
            main_port: 0,
            aux_port: 0,
            data: DataConfig::new(dir.path(), ".dat"),
            cache: CacheConfig { volume_max: 1024, item_volume_max: 1024, item_ttl_sec: 60 },
        };
        let server = Server::bind(config).await.unwrap();
        let main_port = server.main_local_addr().unwrap().port();
        let aux_port = server.aux_local_addr().unwrap().port();
        (server, main_port, aux_port, dir)
    }

    #[tokio::test]
    async fn acquire_and_release_roundtrip() {
        let (server, main_port, aux_port, _dir) = running_server().await;
        let shutdown = server.shutdown_handle();
        let server_task = tokio::spawn(server.run());

        let config = ClientConfig { host: "127.0.0.1".into(), main_port, aux_port, response_message_length_limit: 0 };
        let pool = Arc::new(ClientPool::new(2, config));
        pool.start().await.unwrap();

        let pooled = pool.acquire().await.unwrap();
        let uid = Uid::parse("alpha").unwrap();
        assert_eq!(pooled.show_data(&uid).await.unwrap(), b"hello");
        pool.release(pooled, false).await.unwrap();

        pool.shutdown().await;
        shutdown.cancel();
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn acquire_on_empty_idle_set_reports_no_idle() {
        let (server, main_port, aux_port, _dir) = running_server().await;
        let shutdown = server.shutdown_handle();
        let server_task = tokio::spawn(server.run());

        let config = ClientConfig { host: "127.0.0.1".into(), main_port, aux_port, response_message_length_limit: 0 };
        let pool = Arc::new(ClientPool::new(1, config));
        pool.start().await.unwrap();

        let first = pool.acquire().await.unwrap();
        assert!(matches!(pool.acquire().await, Err(CoreError::PoolNoIdle)));
        pool.release(first, false).await.unwrap();

        pool.shutdown().await;
        shutdown.cancel();
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn releasing_as_broken_routes_away_from_idle() {
        let (server, main_port, aux_port, _dir) = running_server().await;
        let shutdown = server.shutdown_handle();
        let server_task = tokio::spawn(server.run());

        let config = ClientConfig { host: "127.0.0.1".into(), main_port, aux_port, response_message_length_limit: 0 };
        let pool = Arc::new(ClientPool::new(1, config));
        pool.start().await.unwrap();

        let pooled = pool.acquire().await.unwrap();
        pool.release(pooled, true).await.unwrap();
        assert!(matches!(pool.acquire().await, Err(CoreError::PoolNoIdle)));

        pool.shutdown().await;
        shutdown.cancel();
        server_task.await.unwrap();
    }
}
