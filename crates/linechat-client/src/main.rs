//! Linechat client binary.
//!
//! # Usage
//!
//! ```bash
//! linechat-client 127.0.0.1:9000 bob
//! ```

use std::process::ExitCode;

use clap::Parser;
use linechat_client::{ClientConfig, Nickname, run};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Linechat terminal client
#[derive(Parser, Debug)]
#[command(name = "linechat-client")]
#[command(about = "Terminal client for the linechat server")]
#[command(version)]
struct Args {
    /// Server address, as host:port
    address: String,

    /// Nickname: 1 to 12 characters from [A-Za-z0-9_]
    #[arg(value_parser = parse_nickname)]
    nickname: Nickname,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn parse_nickname(candidate: &str) -> Result<Nickname, String> {
    Nickname::parse(candidate).map_err(|e| e.to_string())
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

    // Logs go to stderr so they never interleave with chat output.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let config = ClientConfig { address: args.address, nickname: args.nickname };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "session ended");
            ExitCode::FAILURE
        },
    }
}
