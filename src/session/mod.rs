//! Capture session management
//!
//! This module owns the lifecycle of one recording session: permission
//! check, start, stop/cancel, finalize, and the exactly-once completion
//! callback carrying the recorded file's location.

pub mod manager;
pub mod state;
pub mod stats;

pub use manager::{CaptureConfig, CaptureManager, CompletionHandler, DEFAULT_FILE_NAME};
pub use state::SessionState;
pub use stats::SessionStats;
