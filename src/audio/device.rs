use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::sync::mpsc;
use tracing::info;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Audio input device abstraction
///
/// Platform-specific microphone implementations live behind this trait;
/// the bundled [`ToneDevice`] generates a synthetic signal for demos and
/// tests so the capture path works without audio hardware.
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if the device is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get device name for logging
    fn name(&self) -> &str;
}

/// Frame interval for the synthetic device
const FRAME_INTERVAL_MS: u64 = 10;

/// Synthetic capture device emitting a fixed-frequency sine tone
pub struct ToneDevice {
    sample_rate: u32,
    channels: u16,
    frequency_hz: f32,
    capturing: Arc<AtomicBool>,
}

impl ToneDevice {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            frequency_hz: 440.0,
            capturing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_frequency(mut self, frequency_hz: f32) -> Self {
        self.frequency_hz = frequency_hz;
        self
    }
}

#[async_trait::async_trait]
impl CaptureDevice for ToneDevice {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing.load(Ordering::SeqCst) {
            bail!("Already capturing");
        }

        info!(
            "Starting tone device ({}Hz tone, {}Hz, {} channels)",
            self.frequency_hz, self.sample_rate, self.channels
        );

        self.capturing.store(true, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(100);
        let capturing = Arc::clone(&self.capturing);
        let sample_rate = self.sample_rate;
        let channels = self.channels;
        let frequency = self.frequency_hz;

        tokio::spawn(async move {
            let samples_per_channel = (sample_rate as u64 * FRAME_INTERVAL_MS / 1000) as usize;
            let mut interval = tokio::time::interval(Duration::from_millis(FRAME_INTERVAL_MS));
            let mut timestamp_ms = 0u64;
            let mut phase = 0usize;

            while capturing.load(Ordering::SeqCst) {
                interval.tick().await;

                let mut samples = Vec::with_capacity(samples_per_channel * channels as usize);
                for i in 0..samples_per_channel {
                    let t = (phase + i) as f32 / sample_rate as f32;
                    let value = (t * frequency * 2.0 * std::f32::consts::PI).sin();
                    let sample = (value * i16::MAX as f32 * 0.5) as i16;
                    // Same sample on every channel
                    for _ in 0..channels {
                        samples.push(sample);
                    }
                }
                phase += samples_per_channel;

                let frame = AudioFrame {
                    samples,
                    sample_rate,
                    channels,
                    timestamp_ms,
                };
                timestamp_ms += FRAME_INTERVAL_MS;

                if tx.send(frame).await.is_err() {
                    // Receiver dropped, consumer is gone
                    break;
                }
            }
        });

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing.load(Ordering::SeqCst) {
            return Ok(());
        }

        info!("Stopping tone device");
        self.capturing.store(false, Ordering::SeqCst);

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "Tone generator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tone_device_produces_frames() -> Result<()> {
        let mut device = ToneDevice::new(44100, 2);
        let mut rx = device.start().await?;

        assert!(device.is_capturing());

        let frame = rx.recv().await.expect("should receive a frame");
        assert_eq!(frame.sample_rate, 44100);
        assert_eq!(frame.channels, 2);
        assert!(!frame.samples.is_empty());
        // Interleaved stereo: even sample count
        assert_eq!(frame.samples.len() % 2, 0);

        device.stop().await?;
        assert!(!device.is_capturing());

        Ok(())
    }

    #[tokio::test]
    async fn test_tone_device_rejects_double_start() -> Result<()> {
        let mut device = ToneDevice::new(16000, 1);
        let _rx = device.start().await?;

        assert!(device.start().await.is_err());

        device.stop().await?;
        Ok(())
    }
}
