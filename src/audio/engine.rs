use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::device::{AudioFrame, CaptureDevice};
use super::profile::EncodingProfile;

/// Amplitude metering snapshot (normalized to 0.0..=1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioLevels {
    /// Root-mean-square level of the most recent frame
    pub rms: f32,
    /// Peak level of the most recent frame
    pub peak: f32,
}

impl AudioLevels {
    pub fn silent() -> Self {
        Self { rms: 0.0, peak: 0.0 }
    }
}

/// Recorder engine bound to one target file
///
/// One engine instance serves exactly one recording attempt. The receiver
/// returned by [`start`](RecorderEngine::start) is the engine's finished
/// signal: it resolves exactly once after a non-discarded recording ends,
/// with `true` if the file was finalized cleanly and `false` on a hardware
/// or write failure.
#[async_trait::async_trait]
pub trait RecorderEngine: Send + Sync {
    /// Begin capture
    async fn start(&mut self) -> Result<oneshot::Receiver<bool>>;

    /// Stop capture, flush and close the target file
    ///
    /// The finished signal fires asynchronously once the file is finalized.
    async fn stop(&mut self) -> Result<()>;

    /// Stop capture and delete the target file
    ///
    /// The finished signal never fires for a discarded recording.
    async fn discard(&mut self) -> Result<()>;

    /// Enable or disable amplitude metering
    fn set_metering(&mut self, enabled: bool);

    /// Latest metering snapshot (silent while metering is disabled)
    fn levels(&self) -> AudioLevels;

    /// Check if the engine is currently recording
    fn is_recording(&self) -> bool;

    /// Get engine name for logging
    fn name(&self) -> &str;
}

/// Builds a recorder engine for a target path and profile
pub trait RecorderFactory: Send + Sync {
    fn create(&self, target: &Path, profile: &EncodingProfile) -> Result<Box<dyn RecorderEngine>>;
}

/// Commands sent to the writer task
enum WriterCommand {
    /// Flush, finalize the file, report success
    Finalize,
    /// Drop the file, report nothing
    Discard,
}

/// Shared metering state, updated by the writer task
struct Meter {
    enabled: AtomicBool,
    rms_bits: AtomicU32,
    peak_bits: AtomicU32,
}

impl Meter {
    fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            rms_bits: AtomicU32::new(0),
            peak_bits: AtomicU32::new(0),
        }
    }

    fn update(&self, frame: &AudioFrame) {
        if !self.enabled.load(Ordering::Relaxed) || frame.samples.is_empty() {
            return;
        }

        let mut peak = 0.0f32;
        let mut sum_squares = 0.0f64;
        for &sample in &frame.samples {
            let normalized = sample as f32 / i16::MAX as f32;
            peak = peak.max(normalized.abs());
            sum_squares += (normalized as f64) * (normalized as f64);
        }
        let rms = (sum_squares / frame.samples.len() as f64).sqrt() as f32;

        self.rms_bits.store(rms.to_bits(), Ordering::Relaxed);
        self.peak_bits.store(peak.to_bits(), Ordering::Relaxed);
    }

    fn snapshot(&self) -> AudioLevels {
        AudioLevels {
            rms: f32::from_bits(self.rms_bits.load(Ordering::Relaxed)),
            peak: f32::from_bits(self.peak_bits.load(Ordering::Relaxed)),
        }
    }
}

/// Recorder engine writing 16-bit PCM WAV via hound
///
/// Drains frames from a [`CaptureDevice`] into the target file. The profile's
/// format id is carried for diagnostics; sample data is always written as
/// 16-bit PCM at the profile's rate and channel count. Platform encoders
/// (e.g. AAC) live behind [`RecorderFactory`].
pub struct WavRecorderEngine {
    target: PathBuf,
    profile: EncodingProfile,
    device: Box<dyn CaptureDevice>,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    command_tx: Option<mpsc::Sender<WriterCommand>>,
    recording: Arc<AtomicBool>,
    meter: Arc<Meter>,
}

impl WavRecorderEngine {
    /// Construct an engine bound to `target`
    ///
    /// Opens the target file immediately, so an invalid path or full disk
    /// fails here rather than at [`start`](RecorderEngine::start).
    pub fn new(
        target: PathBuf,
        profile: EncodingProfile,
        device: Box<dyn CaptureDevice>,
    ) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: profile.channels,
            sample_rate: profile.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&target, spec)
            .with_context(|| format!("Failed to create recording file: {:?}", target))?;

        info!(
            "Recorder bound to {:?} ({:?}, {}Hz, {} channels)",
            target, profile.format, profile.sample_rate, profile.channels
        );

        Ok(Self {
            target,
            profile,
            device,
            writer: Some(writer),
            command_tx: None,
            recording: Arc::new(AtomicBool::new(false)),
            meter: Arc::new(Meter::new()),
        })
    }

    /// Writer task: drain frames into the file until told to finalize or
    /// discard, or until the device fails.
    async fn run_writer(
        mut writer: hound::WavWriter<BufWriter<File>>,
        target: PathBuf,
        mut frames: mpsc::Receiver<AudioFrame>,
        mut command_rx: mpsc::Receiver<WriterCommand>,
        finished_tx: oneshot::Sender<bool>,
        recording: Arc<AtomicBool>,
        meter: Arc<Meter>,
    ) {
        let mut samples_written = 0usize;

        let outcome = loop {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(WriterCommand::Finalize) | None => {
                        // Drain anything the device produced before stopping
                        while let Ok(frame) = frames.try_recv() {
                            if let Err(e) = Self::write_frame(&mut writer, &frame, &mut samples_written) {
                                error!("Failed to flush trailing frame: {:#}", e);
                                break;
                            }
                        }
                        match writer.finalize() {
                            Ok(()) => {
                                info!(
                                    "Recording finalized: {:?} ({} samples)",
                                    target, samples_written
                                );
                                break Some(true);
                            }
                            Err(e) => {
                                error!("Failed to finalize recording {:?}: {}", target, e);
                                break Some(false);
                            }
                        }
                    }
                    Some(WriterCommand::Discard) => {
                        drop(writer);
                        if let Err(e) = fs::remove_file(&target) {
                            if e.kind() != std::io::ErrorKind::NotFound {
                                warn!("Failed to remove discarded recording {:?}: {}", target, e);
                            }
                        }
                        info!("Recording discarded: {:?}", target);
                        break None;
                    }
                },
                frame = frames.recv() => match frame {
                    Some(frame) => {
                        meter.update(&frame);
                        if let Err(e) = Self::write_frame(&mut writer, &frame, &mut samples_written) {
                            error!("Recording failed on {:?}: {:#}", target, e);
                            break Some(false);
                        }
                    }
                    None => {
                        // Device went away without a stop request
                        error!("Capture device stopped unexpectedly for {:?}", target);
                        if let Err(e) = writer.finalize() {
                            warn!("Failed to finalize after device failure: {}", e);
                        }
                        break Some(false);
                    }
                },
            }
        };

        recording.store(false, Ordering::SeqCst);

        if let Some(success) = outcome {
            // Receiver may have been dropped (e.g. session cancelled)
            let _ = finished_tx.send(success);
        }
    }

    fn write_frame(
        writer: &mut hound::WavWriter<BufWriter<File>>,
        frame: &AudioFrame,
        samples_written: &mut usize,
    ) -> Result<()> {
        for &sample in &frame.samples {
            writer
                .write_sample(sample)
                .context("Failed to write sample")?;
        }
        *samples_written += frame.samples.len();
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecorderEngine for WavRecorderEngine {
    async fn start(&mut self) -> Result<oneshot::Receiver<bool>> {
        if self.command_tx.is_some() {
            bail!("Recorder already started");
        }

        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => bail!("Recorder already consumed"),
        };

        let frames = self
            .device
            .start()
            .await
            .context("Failed to start capture device")?;

        let (command_tx, command_rx) = mpsc::channel(4);
        let (finished_tx, finished_rx) = oneshot::channel();

        self.recording.store(true, Ordering::SeqCst);
        self.command_tx = Some(command_tx);

        tokio::spawn(Self::run_writer(
            writer,
            self.target.clone(),
            frames,
            command_rx,
            finished_tx,
            Arc::clone(&self.recording),
            Arc::clone(&self.meter),
        ));

        info!("Recording started: {:?}", self.target);

        Ok(finished_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(command_tx) = self.command_tx.take() else {
            return Ok(());
        };

        command_tx
            .send(WriterCommand::Finalize)
            .await
            .context("Writer task is gone")?;

        self.device
            .stop()
            .await
            .context("Failed to stop capture device")?;

        Ok(())
    }

    async fn discard(&mut self) -> Result<()> {
        if let Some(command_tx) = self.command_tx.take() {
            if command_tx.send(WriterCommand::Discard).await.is_err() {
                warn!("Writer task already finished before discard");
            }
            if let Err(e) = self.device.stop().await {
                warn!("Failed to stop capture device on discard: {:#}", e);
            }
        } else {
            // No live writer task (never started, or already stopped); drop
            // any open writer so the file below can be removed cleanly
            self.writer.take();
        }

        // Make the deletion visible to the caller immediately; the writer
        // task holds an open handle, unlinking the path is safe either way.
        if let Err(e) = fs::remove_file(&self.target) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove recording {:?}: {}", self.target, e);
            }
        }

        self.recording.store(false, Ordering::SeqCst);

        Ok(())
    }

    fn set_metering(&mut self, enabled: bool) {
        self.meter.enabled.store(enabled, Ordering::SeqCst);
    }

    fn levels(&self) -> AudioLevels {
        if !self.meter.enabled.load(Ordering::SeqCst) {
            return AudioLevels::silent();
        }
        self.meter.snapshot()
    }

    fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "WAV recorder"
    }
}

impl std::fmt::Debug for WavRecorderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WavRecorderEngine")
            .field("target", &self.target)
            .field("profile", &self.profile)
            .field("recording", &self.is_recording())
            .finish()
    }
}

/// Default factory: a [`WavRecorderEngine`] fed by a [`ToneDevice`]
///
/// Real microphone integrations provide their own [`RecorderFactory`].
pub struct ToneRecorderFactory;

impl RecorderFactory for ToneRecorderFactory {
    fn create(&self, target: &Path, profile: &EncodingProfile) -> Result<Box<dyn RecorderEngine>> {
        let device = Box::new(super::device::ToneDevice::new(
            profile.sample_rate,
            profile.channels,
        ));
        let engine = WavRecorderEngine::new(target.to_path_buf(), profile.clone(), device)?;
        Ok(Box::new(engine))
    }
}
