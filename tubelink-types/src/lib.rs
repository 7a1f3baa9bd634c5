//! Type definitions shared across tubelink crates

pub mod halt;
pub mod summary;

pub use halt::HaltReason;
pub use summary::{RunEnd, RunSummary};
