pub mod device;
pub mod engine;
pub mod profile;
pub mod route;

pub use device::{AudioFrame, CaptureDevice, ToneDevice};
pub use engine::{AudioLevels, RecorderEngine, RecorderFactory, ToneRecorderFactory, WavRecorderEngine};
pub use profile::{AudioFormat, EncodingProfile, Quality};
pub use route::{AudioRouteController, RouteMode, SharedAudioRoute};
