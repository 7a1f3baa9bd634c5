//! Run the handshake against the in-memory device simulator

use std::time::Duration;

use tubelink::{Engine, EngineConfig, MemoryLog};
use tubelink_transport::{SimulatedTransport, Simulator};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let simulator = Simulator::new()
        .with_step_delay(Duration::from_millis(500))
        .with_heartbeats(1);

    let log = MemoryLog::new();
    let config = EngineConfig::default()
        .with_heartbeat_delay(Duration::from_millis(100))
        .with_inter_cycle_pause(Duration::from_millis(200))
        .with_max_cycles(2);

    let mut engine = Engine::new(Box::new(SimulatedTransport::new(simulator)), Box::new(log.clone()))
        .with_config(config);

    let summary = engine.run().await;

    for line in log.lines() {
        println!("{}", line);
    }
    println!("✓ {}", summary);
}
