use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::state::SessionState;
use super::stats::SessionStats;
use crate::audio::{
    AudioLevels, AudioRouteController, EncodingProfile, RecorderEngine, RecorderFactory,
    RouteMode, SharedAudioRoute, ToneRecorderFactory,
};
use crate::permission::{PermissionAuthority, StaticAuthority};

/// File name used when the caller does not supply one
pub const DEFAULT_FILE_NAME: &str = "recording.m4a";

/// Completion handler invoked exactly once per terminal session transition.
///
/// `Some(path)` carries the finalized recording; `None` reports a failed or
/// cancelled session.
pub type CompletionHandler = Box<dyn FnMut(Option<PathBuf>) + Send>;

/// Capture manager configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Directory recordings are resolved into (created on demand)
    pub recordings_dir: PathBuf,

    // Fixed for every session; overriding it is a future extension point
    profile: EncodingProfile,
}

impl CaptureConfig {
    pub fn new(recordings_dir: impl Into<PathBuf>) -> Self {
        Self {
            recordings_dir: recordings_dir.into(),
            profile: EncodingProfile::default(),
        }
    }

    /// The encoding profile applied to every recording
    pub fn profile(&self) -> &EncodingProfile {
        &self.profile
    }
}

/// One in-flight recording attempt, owned exclusively by the manager
struct ActiveSession {
    id: Uuid,
    target: PathBuf,
    started_at: DateTime<Utc>,
    engine: Box<dyn RecorderEngine>,
    waiter: Option<JoinHandle<()>>,
}

/// State guarded by the manager's session lock
struct Inner {
    state: SessionState,
    active: Option<ActiveSession>,
}

/// Owns the lifecycle of at most one recording session at a time.
///
/// Mediates between the permission authority, the shared audio route, a
/// recorder engine and a single registered completion handler. All lifecycle
/// operations are fire-and-forget: internal errors are logged and collapsed
/// into a `None` completion, nothing structural crosses this boundary.
///
/// Callback timing is deliberately asymmetric: [`stop_recording`] delivers
/// its result later, via the engine's asynchronous finished signal (on the
/// manager's tokio runtime), while [`cancel_recording`] and a failed
/// [`start_recording`] deliver `None` before the call returns.
///
/// [`stop_recording`]: CaptureManager::stop_recording
/// [`cancel_recording`]: CaptureManager::cancel_recording
/// [`start_recording`]: CaptureManager::start_recording
pub struct CaptureManager {
    config: CaptureConfig,

    /// External permission authority, queried fresh on every request
    permission: Arc<dyn PermissionAuthority>,

    /// Process-wide shared audio route
    route: Arc<dyn AudioRouteController>,

    /// Builds one recorder engine per session
    engines: Arc<dyn RecorderFactory>,

    inner: Arc<Mutex<Inner>>,

    /// Observable flag, true strictly between a successful start and the
    /// corresponding stop/cancel
    is_recording: Arc<AtomicBool>,

    /// Single-slot completion handler registration (last write wins)
    on_finish: Arc<StdMutex<Option<CompletionHandler>>>,
}

impl CaptureManager {
    pub fn new(
        config: CaptureConfig,
        permission: Arc<dyn PermissionAuthority>,
        route: Arc<dyn AudioRouteController>,
        engines: Arc<dyn RecorderFactory>,
    ) -> Self {
        info!(
            "Capture manager initialized (recordings dir: {:?})",
            config.recordings_dir
        );

        Self {
            config,
            permission,
            route,
            engines,
            inner: Arc::new(Mutex::new(Inner {
                state: SessionState::Idle,
                active: None,
            })),
            is_recording: Arc::new(AtomicBool::new(false)),
            on_finish: Arc::new(StdMutex::new(None)),
        }
    }

    /// Manager wired to the bundled seams: permission always granted,
    /// process-local audio route, tone-fed WAV recorder
    pub fn with_defaults(config: CaptureConfig) -> Self {
        Self::new(
            config,
            Arc::new(StaticAuthority::granted()),
            Arc::new(SharedAudioRoute::new()),
            Arc::new(ToneRecorderFactory),
        )
    }

    /// Ask the permission authority for microphone access.
    ///
    /// Queries the authority exactly once per call and never caches the
    /// answer. The returned future resolves on the caller's task, so the
    /// result is observed on the caller's execution context regardless of
    /// where the authority replied. No session state is touched.
    pub async fn request_permission(&self) -> bool {
        self.permission.request_microphone_access().await
    }

    /// Register the completion handler for subsequent terminal events.
    ///
    /// Single slot, last write wins: registering a new handler replaces any
    /// previous one. There is no handler queue.
    pub fn set_on_finish<F>(&self, handler: F)
    where
        F: FnMut(Option<PathBuf>) + Send + 'static,
    {
        match self.on_finish.lock() {
            Ok(mut slot) => {
                *slot = Some(Box::new(handler));
            }
            Err(_) => warn!("Completion handler slot poisoned, registration dropped"),
        }
    }

    /// Start a recording session writing to `file_name` under the
    /// configured recordings directory.
    ///
    /// Rejected with a `None` completion if a session is already active; the
    /// running session is left untouched. On any setup failure (route
    /// activation, recorder construction, capture start) the state stays
    /// `Idle`, `None` fires before this call returns, and no file is
    /// produced; the caller may simply call again. On success the state is
    /// `Recording` and the completion fires only at a terminal transition.
    pub async fn start_recording(&self, file_name: &str) {
        let mut inner = self.inner.lock().await;

        if inner.active.is_some() {
            warn!("Start rejected: a capture session is already active");
            fire_completion(&self.on_finish, None);
            return;
        }

        inner.state = SessionState::Preparing;

        match self.begin_session(file_name).await {
            Ok(session) => {
                info!(
                    "Recording started: {:?} (session {})",
                    session.target, session.id
                );
                inner.state = SessionState::Recording;
                self.is_recording.store(true, Ordering::SeqCst);
                inner.active = Some(session);
            }
            Err(e) => {
                error!("Failed to start recording: {:#}", e);
                inner.state = SessionState::Idle;
                if let Err(e) = self.route.deactivate().await {
                    warn!("Failed to release audio route: {:#}", e);
                }
                fire_completion(&self.on_finish, None);
            }
        }
    }

    /// Route activation, recorder construction, capture start
    async fn begin_session(&self, file_name: &str) -> Result<ActiveSession> {
        fs::create_dir_all(&self.config.recordings_dir)
            .context("Failed to create recordings directory")?;
        let target = self.config.recordings_dir.join(file_name);

        self.route
            .activate(RouteMode::PlayAndRecord)
            .await
            .context("Audio route activation failed")?;

        let mut engine = self
            .engines
            .create(&target, &self.config.profile)
            .context("Recorder construction failed")?;

        engine.set_metering(true);

        let finished_rx = match engine.start().await {
            Ok(finished_rx) => finished_rx,
            Err(e) => {
                // The engine already opened the target file; a failed start
                // must not leave a file behind
                if let Err(e) = engine.discard().await {
                    warn!("Failed to discard recorder after start failure: {:#}", e);
                }
                return Err(e.context("Recorder failed to begin capture"));
            }
        };

        let id = Uuid::new_v4();
        let waiter = self.spawn_waiter(id, target.clone(), finished_rx);

        Ok(ActiveSession {
            id,
            target,
            started_at: Utc::now(),
            engine,
            waiter: Some(waiter),
        })
    }

    /// Waits for the engine's finished signal and delivers the terminal
    /// completion. This is the sole normal-path deliverer of a successful
    /// result.
    fn spawn_waiter(
        &self,
        session_id: Uuid,
        target: PathBuf,
        finished_rx: oneshot::Receiver<bool>,
    ) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let is_recording = Arc::clone(&self.is_recording);
        let on_finish = Arc::clone(&self.on_finish);
        let route = Arc::clone(&self.route);

        tokio::spawn(async move {
            // A dropped sender means the engine went away without finalizing
            let success = finished_rx.await.unwrap_or(false);

            let mut inner = inner.lock().await;

            // The session may have been cancelled while the signal was in
            // flight; cancellation already delivered its own completion.
            if inner.active.as_ref().map(|s| s.id) != Some(session_id) {
                return;
            }
            inner.active = None;
            inner.state = SessionState::Idle;
            is_recording.store(false, Ordering::SeqCst);

            if let Err(e) = route.deactivate().await {
                warn!("Failed to release audio route: {:#}", e);
            }

            if success {
                info!("Recording finished: {:?}", target);
                fire_completion(&on_finish, Some(target));
            } else {
                error!("Recording failed: {:?}", target);
                fire_completion(&on_finish, None);
            }
        })
    }

    /// Stop the active recording and keep the file.
    ///
    /// Benign no-op (logged) when nothing is recording. The recorder is
    /// signaled to flush and close; the `Some(path)` / `None` completion
    /// arrives asynchronously via the finished signal, so the file must not
    /// be assumed ready when this call returns.
    pub async fn stop_recording(&self) {
        let mut inner = self.inner.lock().await;

        if !inner.state.is_recording() || inner.active.is_none() {
            warn!("Stop requested with no active recording, ignoring");
            return;
        }

        inner.state = SessionState::Finalizing;
        self.is_recording.store(false, Ordering::SeqCst);

        if let Some(session) = inner.active.as_mut() {
            info!("Stopping recording: {:?}", session.target);
            if let Err(e) = session.engine.stop().await {
                error!("Failed to stop recorder cleanly: {:#}", e);
            }
        }
        // Completion is delivered by the finished-signal waiter
    }

    /// Stop the active recording and delete the file.
    ///
    /// Benign no-op (logged) when no session is active. Unlike
    /// [`stop_recording`](CaptureManager::stop_recording), the `None`
    /// completion is delivered before this call returns. Never yields a
    /// file reference.
    pub async fn cancel_recording(&self) {
        let mut inner = self.inner.lock().await;

        let Some(mut session) = inner.active.take() else {
            warn!("Cancel requested with no active session, ignoring");
            return;
        };

        info!("Cancelling recording: {:?}", session.target);

        // The waiter must not observe the discarded engine's teardown
        if let Some(waiter) = session.waiter.take() {
            waiter.abort();
        }

        if let Err(e) = session.engine.discard().await {
            warn!("Failed to discard recording cleanly: {:#}", e);
        }

        self.is_recording.store(false, Ordering::SeqCst);
        inner.state = SessionState::Idle;

        if let Err(e) = self.route.deactivate().await {
            warn!("Failed to release audio route: {:#}", e);
        }

        fire_completion(&self.on_finish, None);
    }

    /// Observable recording flag
    pub fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    /// Current state machine position
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Snapshot of the manager and any active session
    pub async fn stats(&self) -> SessionStats {
        let inner = self.inner.lock().await;

        let (started_at, duration_secs, target) = match &inner.active {
            Some(session) => {
                let elapsed = Utc::now().signed_duration_since(session.started_at);
                (
                    Some(session.started_at),
                    Some(elapsed.num_milliseconds() as f64 / 1000.0),
                    Some(session.target.clone()),
                )
            }
            None => (None, None, None),
        };

        SessionStats {
            is_recording: self.is_recording(),
            state: inner.state,
            started_at,
            duration_secs,
            target,
        }
    }

    /// Metering snapshot of the active session's engine, if any
    pub async fn current_levels(&self) -> Option<AudioLevels> {
        self.inner
            .lock()
            .await
            .active
            .as_ref()
            .map(|session| session.engine.levels())
    }
}

/// Invoke the registered completion handler, if any.
///
/// The handler runs outside the slot lock so it may re-register a handler
/// for the next session; a handler registered during the invocation wins.
fn fire_completion(slot: &StdMutex<Option<CompletionHandler>>, result: Option<PathBuf>) {
    let handler = match slot.lock() {
        Ok(mut slot) => slot.take(),
        Err(_) => {
            warn!("Completion handler slot poisoned, dropping result");
            return;
        }
    };

    let Some(mut handler) = handler else {
        info!("Session ended with no completion handler registered");
        return;
    };

    handler(result);

    match slot.lock() {
        Ok(mut slot) => {
            if slot.is_none() {
                *slot = Some(handler);
            }
        }
        Err(_) => warn!("Completion handler slot poisoned"),
    }
}
