//! relaymond - Relay channel health monitor daemon.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use relaymon::core::logging;
use relaymon::daemon;
use relaymon::relay::transport::HttpTransport;
use relaymon::storage::DaemonConfig;

#[derive(Debug, Parser)]
#[command(name = "relaymond", version, about = "Relay channel health monitor daemon")]
struct Args {
    /// Config file path (overrides RELAYMON_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address override, e.g. 127.0.0.1:8787.
    #[arg(long)]
    bind: Option<String>,

    /// Log level: trace, debug, info, warn, error.
    #[arg(long)]
    log_level: Option<String>,

    /// Log format: human, json, compact.
    #[arg(long)]
    log_format: Option<String>,

    /// Shortcut for --log-level debug.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = args
        .log_level
        .as_deref()
        .and_then(logging::LogLevel::from_arg)
        .unwrap_or_default();
    let log_format = args
        .log_format
        .as_deref()
        .and_then(logging::LogFormat::from_arg)
        .or_else(logging::parse_log_format_from_env)
        .unwrap_or_default();
    let log_file = logging::parse_log_file_from_env();
    logging::init(log_level, log_format, log_file, args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("relaymond: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => DaemonConfig::load_from(path)?,
        None => DaemonConfig::load()?,
    };
    tracing::info!(
        channels = config.channels.len(),
        auto_test = config.monitor.auto_test_enabled,
        "configuration loaded"
    );

    let transport = Arc::new(HttpTransport::with_defaults()?);
    let state = daemon::build_state(&config, transport)?;
    state.fleet.spawn_auto_test_loop();

    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    daemon::serve(state, &bind).await?;
    Ok(())
}
