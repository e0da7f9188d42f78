use serde::{Deserialize, Serialize};

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// Idle → Preparing → Recording → Finalizing → Idle
///                        ↓
///                    (cancel) → Idle
/// ```
///
/// A failed start falls back from `Preparing` to `Idle` without ever
/// reaching `Recording`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No active session; the audio route is released
    Idle,
    /// Route being activated and recorder being constructed
    Preparing,
    /// Recorder actively writing the target file
    Recording,
    /// Stop requested; recorder flushing and closing the file
    Finalizing,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }
}
