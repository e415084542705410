//! End-to-end scenarios over a real loopback TCP server, driven by a real
//! `sfrodb-client`: cached hit, miss-then-file, not-found, invalid key,
//! volume eviction, aux-on-main rejection, and pool broken-and-recover.

use sfrodb_client::{Client, ClientConfig, ClientPool};
use sfrodb_core::{CacheConfig, CoreError, DataConfig, Uid};
use sfrodb_server::{Server, ServerConfig};
use std::sync::Arc;
use tempfile::TempDir;

async fn start_server(dir: &TempDir, cache: CacheConfig) -> (Server, u16, u16) {
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        main_port: 0,
        aux_port: 0,
        data: DataConfig::new(dir.path(), ".dat"),
        cache,
    };
    let server = Server::bind(config).await.expect("bind");
    let main_port = server.main_local_addr().expect("addr").port();
    let aux_port = server.aux_local_addr().expect("addr").port();
    (server, main_port, aux_port)
}

fn default_cache() -> CacheConfig {
    CacheConfig { volume_max: 1024, item_volume_max: 1024, item_ttl_sec: 60 }
}

#[tokio::test]
async fn cached_hit_returns_same_bytes_twice() {
    let dir = tempfile::tempdir().expect("tempdir");
    tokio::fs::write(dir.path().join("alpha.dat"), b"hello").await.expect("write fixture");
    let (server, main_port, aux_port) = start_server(&dir, default_cache()).await;
    let shutdown = server.shutdown_handle();
    let server_task = tokio::spawn(server.run());

    let client = Client::new(
        ClientConfig { host: "127.0.0.1".into(), main_port, aux_port, response_message_length_limit: 0 },
        "s1",
    );
    client.start().await.expect("start");

    let uid = Uid::parse("alpha").expect("valid uid");
    assert_eq!(client.show_data(&uid).await.expect("first call"), b"hello");
    assert_eq!(client.show_data(&uid).await.expect("second call"), b"hello");
    assert!(client.search_record(&uid).await.expect("search_record"));

    client.stop().await.expect("stop");
    shutdown.cancel();
    server_task.await.expect("server task");
}

#[tokio::test]
async fn miss_then_file_populates_cache_after_disk_read() {
    let dir = tempfile::tempdir().expect("tempdir");
    tokio::fs::write(dir.path().join("beta.dat"), b"world").await.expect("write fixture");
    let (server, main_port, aux_port) = start_server(&dir, default_cache()).await;
    let shutdown = server.shutdown_handle();
    let server_task = tokio::spawn(server.run());

    let client = Client::new(
        ClientConfig { host: "127.0.0.1".into(), main_port, aux_port, response_message_length_limit: 0 },
        "s2",
    );
    client.start().await.expect("start");

    let uid = Uid::parse("beta").expect("valid uid");
    assert!(!client.search_record(&uid).await.expect("search_record before"));
    assert!(client.search_file(&uid).await.expect("search_file"));
    assert_eq!(client.show_data(&uid).await.expect("show_data"), b"world");
    assert!(client.search_record(&uid).await.expect("search_record after"));

    client.stop().await.expect("stop");
    shutdown.cancel();
    server_task.await.expect("server task");
}

#[tokio::test]
async fn not_found_is_client_class_and_connection_survives() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (server, main_port, aux_port) = start_server(&dir, default_cache()).await;
    let shutdown = server.shutdown_handle();
    let server_task = tokio::spawn(server.run());

    let client = Client::new(
        ClientConfig { host: "127.0.0.1".into(), main_port, aux_port, response_message_length_limit: 0 },
        "s3",
    );
    client.start().await.expect("start");

    let uid = Uid::parse("ghost").expect("valid uid");
    assert!(matches!(client.show_data(&uid).await, Err(CoreError::NotFound)));
    assert!(matches!(client.show_data(&uid).await, Err(CoreError::NotFound)));

    client.stop().await.expect("stop");
    shutdown.cancel();
    server_task.await.expect("server task");
}

#[tokio::test]
async fn invalid_key_is_rejected_before_any_bytes_are_sent() {
    let err = Uid::parse("bad.key").unwrap_err();
    assert!(matches!(err, sfrodb_proto::ProtocolError::UidInvalid));
}

#[tokio::test]
async fn volume_eviction_is_fifo_across_the_wire() {
    let dir = tempfile::tempdir().expect("tempdir");
    tokio::fs::write(dir.path().join("a.dat"), b"0123456789").await.expect("write a");
    tokio::fs::write(dir.path().join("b.dat"), b"XYZ").await.expect("write b");
    let cache = CacheConfig { volume_max: 10, item_volume_max: 10, item_ttl_sec: 60 };
    let (server, main_port, aux_port) = start_server(&dir, cache).await;
    let shutdown = server.shutdown_handle();
    let server_task = tokio::spawn(server.run());

    let client = Client::new(
        ClientConfig { host: "127.0.0.1".into(), main_port, aux_port, response_message_length_limit: 0 },
        "s5",
    );
    client.start().await.expect("start");

    let a = Uid::parse("a").expect("valid uid");
    let b = Uid::parse("b").expect("valid uid");
    client.show_data(&a).await.expect("fill with a");
    client.show_data(&b).await.expect("evict a, insert b");

    assert!(!client.search_record(&a).await.expect("search_record a"));
    assert!(client.search_record(&b).await.expect("search_record b"));

    client.stop().await.expect("stop");
    shutdown.cancel();
    server_task.await.expect("server task");
}

#[tokio::test]
async fn aux_verb_on_main_channel_is_rejected_without_closing_connection() {
    use sfrodb_core::Connection;
    use sfrodb_proto::{Method, Status};
    use tokio::net::TcpStream;

    let dir = tempfile::tempdir().expect("tempdir");
    tokio::fs::write(dir.path().join("alpha.dat"), b"hello").await.expect("write fixture");
    let (server, main_port, _aux_port) = start_server(&dir, default_cache()).await;
    let shutdown = server.shutdown_handle();
    let server_task = tokio::spawn(server.run());

    let stream = TcpStream::connect(("127.0.0.1", main_port)).await.expect("connect main");
    let mut main = Connection::from_tcp_stream(stream, 0, "s6").expect("wrap stream");

    let uid = Uid::parse("alpha").expect("valid uid");
    main.send_request(Method::ResetCache, None).await.expect("send ResetCache on main");
    let resp = main.receive_response().await.expect("receive response");
    assert_eq!(resp.status, Status::ClientError);

    main.send_request(Method::ShowData, Some(&uid)).await.expect("send ShowData on main");
    let resp = main.receive_response().await.expect("receive response");
    assert_eq!(resp.status, Status::ShowingData);
    assert_eq!(resp.data, b"hello");

    main.close().await.expect("close");
    shutdown.cancel();
    server_task.await.expect("server task");
}

#[tokio::test]
async fn keyed_verb_with_no_uid_is_client_error_and_connection_survives() {
    use sfrodb_core::Connection;
    use sfrodb_proto::{Method, Status};
    use tokio::net::TcpStream;

    let dir = tempfile::tempdir().expect("tempdir");
    tokio::fs::write(dir.path().join("alpha.dat"), b"hello").await.expect("write fixture");
    let (server, main_port, _aux_port) = start_server(&dir, default_cache()).await;
    let shutdown = server.shutdown_handle();
    let server_task = tokio::spawn(server.run());

    let stream = TcpStream::connect(("127.0.0.1", main_port)).await.expect("connect main");
    let mut main = Connection::from_tcp_stream(stream, 0, "s7").expect("wrap stream");

    // ShowData requires a key; sending it with a true zero-length UID (the
    // wire form `ResetCache`/`CloseConnection` legitimately use) must be
    // answered with a client-class error, not a dropped connection.
    main.send_request(Method::ShowData, None).await.expect("send ShowData with no uid");
    let resp = main.receive_response().await.expect("receive response");
    assert_eq!(resp.status, Status::ClientError);

    let uid = Uid::parse("alpha").expect("valid uid");
    main.send_request(Method::ShowData, Some(&uid)).await.expect("send ShowData on same connection");
    let resp = main.receive_response().await.expect("receive response after client error");
    assert_eq!(resp.status, Status::ShowingData);
    assert_eq!(resp.data, b"hello");

    main.close().await.expect("close");
    shutdown.cancel();
    server_task.await.expect("server task");
}

#[tokio::test]
async fn pool_recovers_a_broken_client_once_the_server_returns() {
    let dir = tempfile::tempdir().expect("tempdir");
    tokio::fs::write(dir.path().join("alpha.dat"), b"hello").await.expect("write fixture");
    let (server, main_port, aux_port) = start_server(&dir, default_cache()).await;
    let server_shutdown = server.shutdown_handle();
    let mut server_task = tokio::spawn(server.run());

    let pool_config =
        ClientConfig { host: "127.0.0.1".into(), main_port, aux_port, response_message_length_limit: 0 };
    let pool = Arc::new(ClientPool::new(2, pool_config));
    pool.start().await.expect("pool start");

    let first = pool.acquire().await.expect("acquire first");
    server_shutdown.cancel();
    server_task.await.expect("server task stopped");
    pool.release(first, true).await.expect("release as broken");

    // Restart the server on the same ports and give the background
    // restarter one cycle to notice and reconnect.
    let (server, _main_port, _aux_port) = start_server_on(&dir, default_cache(), main_port, aux_port).await;
    let new_shutdown = server.shutdown_handle();
    server_task = tokio::spawn(server.run());

    tokio::time::sleep(std::time::Duration::from_secs(16)).await;

    let recovered = pool.acquire().await.expect("broken client promoted back to idle");
    let uid = Uid::parse("alpha").expect("valid uid");
    assert_eq!(recovered.show_data(&uid).await.expect("show_data after recovery"), b"hello");
    pool.release(recovered, false).await.expect("release recovered");

    pool.shutdown().await;
    new_shutdown.cancel();
    server_task.await.expect("server task");
}

async fn start_server_on(dir: &TempDir, cache: CacheConfig, main_port: u16, aux_port: u16) -> (Server, u16, u16) {
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        main_port,
        aux_port,
        data: DataConfig::new(dir.path(), ".dat"),
        cache,
    };
    let server = Server::bind(config).await.expect("rebind on same ports");
    let main_port = server.main_local_addr().expect("addr").port();
    let aux_port = server.aux_local_addr().expect("addr").port();
    (server, main_port, aux_port)
}
