use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::SessionState;

/// Snapshot of the manager's session state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whether recording is currently active
    pub is_recording: bool,

    /// Current state machine position
    pub state: SessionState,

    /// When the active session started, if any
    pub started_at: Option<DateTime<Utc>>,

    /// Duration of the active session in seconds, if any
    pub duration_secs: Option<f64>,

    /// Target file of the active session, if any
    pub target: Option<PathBuf>,
}
