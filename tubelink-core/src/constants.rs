//! Protocol constants

use std::time::Duration;

/// Heartbeat token: the device is busy and has nothing to report yet
pub const HEARTBEAT: &str = "NO";

/// Line terminator appended to every command
pub const LINE_TERMINATOR: &str = "\n";

/// Default delay after a heartbeat before reading again
pub const DEFAULT_HEARTBEAT_DELAY: Duration = Duration::from_secs(5);

/// Default pause between two handshake cycles
pub const DEFAULT_INTER_CYCLE_PAUSE: Duration = Duration::from_secs(1);

/// Device tokens
pub mod tokens {
    pub const BOK: &str = "BOK";
    pub const BNO: &str = "BNO";
    pub const DECAP_OK: &str = "DECAP_OK";
    pub const DECAP_ERR: &str = "DECAP_ERR";
    pub const COK: &str = "COK";
    pub const CNO: &str = "CNO";
    pub const RECAP_OK: &str = "RECAP_OK";
    pub const RECAP_ERR: &str = "RECAP_ERR";

    /// Reported by the device at any stage when the loaded tube is wrong
    pub const STATUS_WRONG_TUBE: &str = "STATUS_WRONG_TUBE";
}

/// Host commands
pub mod commands {
    /// Start decapping
    pub const B: &str = "B";

    /// Start recapping
    pub const C: &str = "C";
}
