//! Command-line driver: runs the handshake against a serial device

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use tubelink::{Engine, EngineConfig, SessionLog};
use tubelink_transport::{SerialConfig, SerialTransport};

/// Drive the decap/recap handshake and log every step
#[derive(Debug, Parser)]
#[command(name = "tubelink", version, about)]
struct Args {
    /// Serial port (`/dev/ttyUSB0`, `COM5`)
    #[arg(short, long)]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value_t = 9600)]
    baud: u32,

    /// Blocking read timeout of the serial driver, in milliseconds.
    /// Response windows are fixed per step and not affected by this.
    #[arg(long, default_value_t = 1000)]
    read_timeout_ms: u64,

    /// Directory for the session log file
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,

    /// Stop after this many completed cycles
    #[arg(long)]
    cycles: Option<u64>,

    /// Wait after a `NO` heartbeat, in seconds
    #[arg(long, default_value_t = 5)]
    heartbeat_delay_secs: u64,

    /// Pause between cycles, in seconds
    #[arg(long, default_value_t = 1)]
    pause_secs: u64,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        let config = EngineConfig::default()
            .with_heartbeat_delay(Duration::from_secs(self.heartbeat_delay_secs))
            .with_inter_cycle_pause(Duration::from_secs(self.pause_secs));

        match self.cycles {
            Some(cycles) => config.with_max_cycles(cycles),
            None => config,
        }
    }

    fn serial_config(&self) -> SerialConfig {
        SerialConfig::new(&self.port)
            .with_baud_rate(self.baud)
            .with_read_timeout(Duration::from_millis(self.read_timeout_ms))
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let log = SessionLog::create(&args.log_dir)
        .with_context(|| format!("creating session log in {}", args.log_dir.display()))?;
    let log_path = log.path().to_path_buf();

    let transport = SerialTransport::with_config(args.serial_config());
    let mut engine = Engine::new(Box::new(transport), Box::new(log)).with_config(args.engine_config());

    let finished = tokio::select! {
        summary = engine.run() => Some(summary),
        _ = interrupted() => None,
    };

    let summary = match finished {
        Some(summary) => summary,
        None => {
            warn!("Interrupted, shutting down");
            engine.stop_signal().stop();
            engine.shutdown().await
        }
    };

    println!("{} (log: {})", summary, log_path.display());

    Ok(if summary.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
