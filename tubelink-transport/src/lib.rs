//! Transport layer for the tubelink handshake
//!
//! Provides line-oriented serial communication with the device, plus
//! scripted and simulated transports for tests.

pub mod error;
pub mod script;
pub mod serial;
pub mod sim;

pub use error::{Error, Result};
pub use script::{Reply, ScriptedTransport, Transcript};
pub use serial::{SerialConfig, SerialTransport};
pub use sim::{Fault, SimulatedTransport, Simulator};

use std::time::Duration;

use async_trait::async_trait;

/// Line-oriented, timeout-capable duplex channel to the device
#[async_trait]
pub trait Transport: Send {
    /// Open the channel
    async fn open(&mut self) -> Result<()>;

    /// Close the channel. Safe to call when never opened or already closed.
    async fn close(&mut self);

    /// Check if open
    fn is_open(&self) -> bool;

    /// Write `line` followed by the line terminator
    async fn send_line(&mut self, line: &str) -> Result<()>;

    /// Wait up to `timeout` for one complete line.
    ///
    /// Returns `Ok(None)` when the timeout elapses; that is a normal outcome,
    /// not an error. The returned line still carries its terminator.
    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>>;

    /// Port name or other description of the remote end
    fn address(&self) -> String;

    /// Line speed, if the channel has one
    fn baud_rate(&self) -> Option<u32> {
        None
    }
}
