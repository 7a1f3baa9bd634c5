//! # tubelink-core
//!
//! Protocol primitives for the tube decapper/recapper serial handshake.
//!
//! This crate provides:
//! - Response sanitization and heartbeat detection
//! - The fixed step table and response classification
//! - The handshake state machine
//! - Session tracking (state, cycle counter, halt record)

pub mod constants;
pub mod error;
pub mod machine;
pub mod response;
pub mod session;
pub mod step;

pub use error::{Error, Result};
pub use machine::{Input, State, Transition, transition};
pub use response::{Response, sanitize};
pub use session::{Halt, Session, SessionState};
pub use step::{Outcome, PROTOCOL, Step};
