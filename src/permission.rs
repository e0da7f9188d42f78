use tracing::info;

/// External authority deciding whether microphone capture is allowed.
///
/// The manager queries this once per permission request and never caches the
/// answer. Platform integrations (OS permission prompts) live behind this
/// trait; [`StaticAuthority`] serves demos and tests.
#[async_trait::async_trait]
pub trait PermissionAuthority: Send + Sync {
    /// Ask for microphone access, returning whether it was granted
    async fn request_microphone_access(&self) -> bool;
}

/// Authority with a fixed answer
pub struct StaticAuthority {
    granted: bool,
}

impl StaticAuthority {
    pub fn granted() -> Self {
        Self { granted: true }
    }

    pub fn denied() -> Self {
        Self { granted: false }
    }
}

#[async_trait::async_trait]
impl PermissionAuthority for StaticAuthority {
    async fn request_microphone_access(&self) -> bool {
        info!(
            "Microphone permission request: {}",
            if self.granted { "granted" } else { "denied" }
        );
        self.granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_authority_answers() {
        assert!(StaticAuthority::granted().request_microphone_access().await);
        assert!(!StaticAuthority::denied().request_microphone_access().await);
    }
}
