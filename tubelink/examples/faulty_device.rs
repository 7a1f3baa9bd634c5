//! Show how the engine halts when the device reports a failure

use tubelink::{Engine, MemoryLog, RunEnd};
use tubelink_transport::{Fault, SimulatedTransport, Simulator};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let fault = std::env::var("FAULT")
        .ok()
        .and_then(|name| name.parse::<Fault>().ok())
        .unwrap_or(Fault::RejectC);

    println!("Injecting fault: {}", fault);

    let transport = SimulatedTransport::new(Simulator::new().with_fault(fault));
    let mut engine = Engine::new(Box::new(transport), Box::new(MemoryLog::new()));

    let summary = engine.run().await;

    match summary.end {
        RunEnd::Halted { state, reason } => println!("✓ Halted in {}: {}", state, reason),
        other => println!("Run ended: {:?}", other),
    }
}
