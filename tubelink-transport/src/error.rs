//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot open {address}: {reason}")]
    Connection {
        address: String,
        reason: String,
    },

    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Write failed: {0}")]
    Write(#[source] io::Error),

    #[error("Connection closed by remote")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Write error for a channel that is not open
    pub fn not_open() -> Self {
        Self::Write(io::Error::new(io::ErrorKind::NotConnected, "channel not open"))
    }
}
