//! # tubelink
//!
//! Serial handshake driver for tube decapper/recapper devices.
//!
//! ## Features
//!
//! - Explicit state machine over the fixed `B`/`C` handshake
//! - Timeout-bounded waits that ride out `NO` heartbeats
//! - Fail-fast halting on error tokens, unknown responses and timeouts
//! - Append-only, timestamped session log
//!
//! ## Quick Start
//!
//! ```no_run
//! use tubelink::{Engine, EngineConfig, SessionLog};
//! use tubelink_transport::SerialTransport;
//!
//! #[tokio::main]
//! async fn main() -> tubelink::Result<()> {
//!     let transport = SerialTransport::new("COM5", 9600);
//!     let log = SessionLog::create(".")?;
//!
//!     let mut engine = Engine::new(Box::new(transport), Box::new(log))
//!         .with_config(EngineConfig::default().with_max_cycles(10));
//!
//!     let summary = engine.run().await;
//!     println!("{}", summary);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod log;

// Re-exports
pub use config::EngineConfig;
pub use engine::{CycleEnd, Engine, StopSignal};
pub use error::{Error, Result};
pub use event::Event;
pub use log::{EventSink, MemoryLog, SessionLog};

// Re-export types
pub use tubelink_core::{Session, State};
pub use tubelink_types::{HaltReason, RunEnd, RunSummary};
