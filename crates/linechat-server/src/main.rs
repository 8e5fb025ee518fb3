//! Linechat server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on all interfaces
//! linechat-server 0.0.0.0:9000
//!
//! # Do not echo chat lines back to their sender
//! linechat-server 127.0.0.1:9000 --no-echo
//! ```

use std::process::ExitCode;

use clap::Parser;
use linechat_server::{
    BroadcastPolicy, DEFAULT_MAX_CONNECTIONS, Server, ServerConfig, ServerRuntimeConfig,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Linechat protocol server
#[derive(Parser, Debug)]
#[command(name = "linechat-server")]
#[command(about = "Single-room line chat server")]
#[command(version)]
struct Args {
    /// Address to listen on, as host:port
    address: String,

    /// Maximum concurrent connections (each uses two file descriptors)
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    max_connections: usize,

    /// Do not send chat lines back to their sender
    #[arg(long)]
    no_echo: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Help and version go to stdout and are not failures.
            let code = if err.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
            if err.print().is_err() {
                return ExitCode::FAILURE;
            }
            return code;
        },
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let policy =
        if args.no_echo { BroadcastPolicy::ExcludeSender } else { BroadcastPolicy::IncludeSender };

    let config = ServerRuntimeConfig {
        bind_address: args.address,
        driver: ServerConfig {
            max_connections: args.max_connections,
            broadcast_policy: policy,
            ..Default::default()
        },
        ..Default::default()
    };

    tracing::info!(address = %config.bind_address, "linechat server starting");

    let server = match Server::bind(config).await {
        Ok(server) => server,
        Err(err) => {
            tracing::error!(%err, "failed to start server");
            return ExitCode::FAILURE;
        },
    };

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "server stopped");
            ExitCode::FAILURE
        },
    }
}
