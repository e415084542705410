//! Minimal SFRODB client CLI: one connection, one action, then exit.
//!
//! # Usage
//!
//! ```bash
//! sfrodb-client --host 127.0.0.1 --main-port 13260 --aux-port 13261 show-data my-key
//! ```

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sfrodb_client::{Client, ClientConfig};
use sfrodb_core::Uid;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// SFRODB: Simple File-Read-Only DataBase client
#[derive(Parser, Debug)]
#[command(name = "sfrodb-client")]
#[command(about = "Issues one request against an SFRODB server and exits")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Main channel port
    #[arg(long, default_value_t = 13260)]
    main_port: u16,

    /// Aux channel port
    #[arg(long, default_value_t = 13261)]
    aux_port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Fetch a blob by key and write it to stdout
    ShowData {
        /// The key to fetch
        uid: String,
    },
    /// Report whether a key is in the server's cache
    SearchRecord {
        /// The key to check
        uid: String,
    },
    /// Report whether a key has a backing file on disk
    SearchFile {
        /// The key to check
        uid: String,
    },
    /// Evict a key from the server's cache
    ForgetRecord {
        /// The key to evict
        uid: String,
    },
    /// Clear the server's whole cache
    ResetCache,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "request failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig {
        host: args.host,
        main_port: args.main_port,
        aux_port: args.aux_port,
        ..ClientConfig::default()
    };

    let client = Client::new(config, "cli");
    client.start().await?;

    match args.action {
        Action::ShowData { uid } => {
            let uid = Uid::parse(uid)?;
            let data = client.show_data(&uid).await?;
            std::io::stdout().write_all(&data)?;
        }
        Action::SearchRecord { uid } => {
            let uid = Uid::parse(uid)?;
            let exists = client.search_record(&uid).await?;
            writeln!(std::io::stdout(), "{exists}")?;
        }
        Action::SearchFile { uid } => {
            let uid = Uid::parse(uid)?;
            let exists = client.search_file(&uid).await?;
            writeln!(std::io::stdout(), "{exists}")?;
        }
        Action::ForgetRecord { uid } => {
            let uid = Uid::parse(uid)?;
            client.forget_record(&uid).await?;
        }
        Action::ResetCache => {
            client.reset_cache().await?;
        }
    }

    client.close_connection_main(true).await?;
    client.close_connection_aux(true).await?;
    client.stop().await?;
    Ok(())
}
