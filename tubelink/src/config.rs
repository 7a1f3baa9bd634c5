//! Engine configuration

use std::time::Duration;

use tubelink_core::constants::{DEFAULT_HEARTBEAT_DELAY, DEFAULT_INTER_CYCLE_PAUSE};

/// Handshake engine timing and limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Wait after a heartbeat before reading again
    pub heartbeat_delay: Duration,

    /// Pause between completed cycles
    pub inter_cycle_pause: Duration,

    /// Stop after this many completed cycles (`None` runs until halted)
    pub max_cycles: Option<u64>,
}

impl EngineConfig {
    pub fn with_heartbeat_delay(mut self, delay: Duration) -> Self {
        self.heartbeat_delay = delay;
        self
    }

    pub fn with_inter_cycle_pause(mut self, pause: Duration) -> Self {
        self.inter_cycle_pause = pause;
        self
    }

    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            heartbeat_delay: DEFAULT_HEARTBEAT_DELAY,
            inter_cycle_pause: DEFAULT_INTER_CYCLE_PAUSE,
            max_cycles: None,
        }
    }
}
