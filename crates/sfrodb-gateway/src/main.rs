//! SFHS binary: HTTP gateway fronting an SFRODB server.
//!
//! # Usage
//!
//! ```bash
//! sfhs --host 0.0.0.0 --port 8080 --db-host 127.0.0.1 --db-main-port 13260 --db-aux-port 13261
//! ```

use clap::Parser;
use sfrodb_client::ClientConfig;
use sfrodb_gateway::{Gateway, GatewayConfig, ListenMode};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// SFHS: HTTP gateway fronting SFRODB for browser clients
#[derive(Parser, Debug)]
#[command(name = "sfhs")]
#[command(about = "Serves GET /<key> over HTTP by proxying to a pool of SFRODB clients")]
#[command(version)]
struct Args {
    /// Host the HTTP listener binds to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port the HTTP listener binds to
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Serve HTTPS using `--cert-path`/`--key-path` instead of plain HTTP
    #[arg(long)]
    https: bool,

    /// PEM certificate chain, required when `--https` is set
    #[arg(long)]
    cert_path: Option<String>,

    /// PEM private key, required when `--https` is set
    #[arg(long)]
    key_path: Option<String>,

    /// SFRODB server host
    #[arg(long, default_value = "127.0.0.1")]
    db_host: String,

    /// SFRODB server main-channel port
    #[arg(long, default_value_t = 13260)]
    db_main_port: u16,

    /// SFRODB server aux-channel port
    #[arg(long, default_value_t = 13261)]
    db_aux_port: u16,

    /// Number of pooled SFRODB clients
    #[arg(long, default_value_t = 4)]
    pool_size: usize,

    /// `Content-Type` applied to every successful response
    #[arg(long, default_value = "application/octet-stream")]
    mime_type: String,

    /// `max-age`, in seconds, for the `Cache-Control` header
    #[arg(long, default_value_t = 3600)]
    cache_max_age_sec: u64,

    /// `Access-Control-Allow-Origin` value; omitted entirely if unset
    #[arg(long)]
    cors_origin: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mode = if args.https {
        let (Some(cert_path), Some(key_path)) = (args.cert_path.clone(), args.key_path.clone()) else {
            return Err("--https requires --cert-path and --key-path".into());
        };
        ListenMode::Https { cert_path, key_path }
    } else {
        ListenMode::Http
    };

    let config = GatewayConfig {
        host: args.host,
        port: args.port,
        mode,
        client: ClientConfig {
            host: args.db_host,
            main_port: args.db_main_port,
            aux_port: args.db_aux_port,
            ..ClientConfig::default()
        },
        pool_size: args.pool_size,
        mime_type: args.mime_type,
        cache_max_age_sec: args.cache_max_age_sec,
        cors_origin: args.cors_origin,
        ..GatewayConfig::default()
    };

    let gateway = Gateway::bind(config).await?;
    let shutdown = gateway.shutdown_handle();

    tracing::info!(addr = %gateway.local_addr()?, "gateway listening");

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received shutdown signal");
            shutdown.cancel();
        }
    });

    gateway.run().await?;
    Ok(())
}
