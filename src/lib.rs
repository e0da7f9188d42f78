pub mod audio;
pub mod config;
pub mod permission;
pub mod session;

pub use audio::{
    AudioFormat, AudioFrame, AudioLevels, AudioRouteController, CaptureDevice, EncodingProfile,
    Quality, RecorderEngine, RecorderFactory, RouteMode, SharedAudioRoute, ToneDevice,
    ToneRecorderFactory, WavRecorderEngine,
};
pub use config::Config;
pub use permission::{PermissionAuthority, StaticAuthority};
pub use session::{
    CaptureConfig, CaptureManager, CompletionHandler, SessionState, SessionStats,
    DEFAULT_FILE_NAME,
};
