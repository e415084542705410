//! SFRODB server binary.
//!
//! # Usage
//!
//! ```bash
//! sfrodb-server --host 0.0.0.0 --main-port 13260 --aux-port 13261 --data-folder ./data
//! ```

use clap::Parser;
use sfrodb_core::{CacheConfig, DataConfig};
use sfrodb_server::{Server, ServerConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// SFRODB: Simple File-Read-Only DataBase server
#[derive(Parser, Debug)]
#[command(name = "sfrodb-server")]
#[command(about = "Serves immutable blobs from a directory over a length-prefixed TCP protocol")]
#[command(version)]
struct Args {
    /// Host both listeners bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port for the read-only main channel
    #[arg(long, default_value_t = 13260)]
    main_port: u16,

    /// Port for the mutating aux channel
    #[arg(long, default_value_t = 13261)]
    aux_port: u16,

    /// Directory containing one file per key
    #[arg(long, default_value = "./data")]
    data_folder: String,

    /// Extension appended to every key to form a filename
    #[arg(long, default_value = ".dat")]
    extension: String,

    /// Aggregate byte budget for the cache
    #[arg(long, default_value_t = 64 * 1024 * 1024)]
    cache_volume_max: usize,

    /// Largest single blob eligible for caching
    #[arg(long, default_value_t = 8 * 1024 * 1024)]
    cached_item_volume_max: usize,

    /// Cache entry time-to-live, in seconds
    #[arg(long, default_value_t = 3600)]
    cached_item_ttl_sec: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = ServerConfig {
        host: args.host,
        main_port: args.main_port,
        aux_port: args.aux_port,
        data: DataConfig::new(args.data_folder, args.extension),
        cache: CacheConfig {
            volume_max: args.cache_volume_max,
            item_volume_max: args.cached_item_volume_max,
            item_ttl_sec: args.cached_item_ttl_sec,
        },
    };

    let server = Server::bind(config).await?;
    let shutdown = server.shutdown_handle();

    tracing::info!(
        main = %server.main_local_addr()?,
        aux = %server.aux_local_addr()?,
        "listening"
    );

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received shutdown signal");
            shutdown.cancel();
        }
    });

    server.run().await;

    Ok(())
}
