//! Device simulator: answers the handshake on a serial port
//!
//! Pair it with `tubelink` over a virtual null-modem (`socat`, com0com).

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tubelink_transport::{Fault, Reply, SerialTransport, Simulator, Transport};

#[derive(Debug, Parser)]
#[command(name = "tubelink-sim", version, about = "Simulated decapper/recapper")]
struct Args {
    /// Serial port to serve on
    #[arg(short, long)]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value_t = 9600)]
    baud: u32,

    /// Seconds between acknowledgement and result
    #[arg(long, default_value_t = 5)]
    step_delay_secs: u64,

    /// `NO` heartbeats sent while busy
    #[arg(long, default_value_t = 0)]
    heartbeats: usize,

    /// Inject a failure: wrong-tube, reject-b, decap-error, reject-c, recap-error, silent
    #[arg(long)]
    fault: Option<Fault>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut simulator = Simulator::new()
        .with_step_delay(Duration::from_secs(args.step_delay_secs))
        .with_heartbeats(args.heartbeats);
    if let Some(fault) = args.fault {
        simulator = simulator.with_fault(fault);
    }

    let mut port = SerialTransport::new(&args.port, args.baud);
    port.open()
        .await
        .with_context(|| format!("opening {}", args.port))?;

    info!("Simulator running on {}...", args.port);

    let result = serve(&mut port, &simulator).await;
    port.close().await;
    result
}

async fn serve(port: &mut SerialTransport, simulator: &Simulator) -> anyhow::Result<()> {
    loop {
        let Some(line) = port.read_line(Duration::from_secs(1)).await? else {
            continue;
        };

        info!("Received: {}", line.trim());

        for reply in simulator.respond(&line) {
            match reply {
                Reply::Line(text) => {
                    port.send_line(&text).await?;
                    info!("Sent: {}", text);
                }
                Reply::Pause(pause) => sleep(pause).await,
            }
        }
    }
}
