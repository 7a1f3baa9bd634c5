//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] tubelink_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] tubelink_transport::Error),

    #[error("Session log error: {0}")]
    Log(#[from] std::io::Error),

    #[error("Device not connected")]
    NotConnected,
}
