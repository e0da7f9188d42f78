use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use tracing::{info, warn};

/// How the shared audio route should be claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMode {
    /// Simultaneous playback and capture (used for recording sessions)
    PlayAndRecord,
    /// Playback only
    Playback,
    /// Capture only
    Record,
}

/// Controller for the device-wide shared audio route.
///
/// Activating the route claims the audio input/output hardware for the
/// requested mode. The route is process-wide mutable state: activation may
/// preempt other audio users on the device. This crate only reports
/// activation failure, it does not arbitrate conflicts.
#[async_trait::async_trait]
pub trait AudioRouteController: Send + Sync {
    /// Claim the route for the given mode
    async fn activate(&self, mode: RouteMode) -> Result<()>;

    /// Release the route
    async fn deactivate(&self) -> Result<()>;

    /// Check whether the route is currently held
    fn is_active(&self) -> bool;
}

/// Default route controller modeling the shared route as a process-local flag
///
/// Platform integrations (e.g. an OS audio session) live behind
/// [`AudioRouteController`]; this implementation tracks activation state and
/// is always able to activate.
pub struct SharedAudioRoute {
    active: AtomicBool,
}

impl SharedAudioRoute {
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
        }
    }
}

impl Default for SharedAudioRoute {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AudioRouteController for SharedAudioRoute {
    async fn activate(&self, mode: RouteMode) -> Result<()> {
        if self.active.swap(true, Ordering::SeqCst) {
            // Activation is idempotent
            warn!("Audio route already active, re-activating for {:?}", mode);
            return Ok(());
        }

        info!("Audio route activated ({:?})", mode);
        Ok(())
    }

    async fn deactivate(&self) -> Result<()> {
        if self.active.swap(false, Ordering::SeqCst) {
            info!("Audio route deactivated");
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_route_activation_roundtrip() -> Result<()> {
        let route = SharedAudioRoute::new();
        assert!(!route.is_active());

        route.activate(RouteMode::PlayAndRecord).await?;
        assert!(route.is_active());

        route.deactivate().await?;
        assert!(!route.is_active());

        Ok(())
    }

    #[tokio::test]
    async fn test_route_activation_is_idempotent() -> Result<()> {
        let route = SharedAudioRoute::new();

        route.activate(RouteMode::PlayAndRecord).await?;
        route.activate(RouteMode::PlayAndRecord).await?;
        assert!(route.is_active());

        Ok(())
    }
}
