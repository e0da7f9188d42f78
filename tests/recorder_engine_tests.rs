// Integration tests for the bundled WAV recorder engine
//
// These tests verify that the engine drains a capture device into a valid
// WAV file, that discard removes the file, and that metering reports
// levels for a live signal.

use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;
use voxnote::{EncodingProfile, RecorderEngine, ToneDevice, WavRecorderEngine};

const FINISH_TIMEOUT: Duration = Duration::from_secs(2);

fn tone_engine(target: std::path::PathBuf) -> Result<WavRecorderEngine> {
    let profile = EncodingProfile::default();
    let device = Box::new(ToneDevice::new(profile.sample_rate, profile.channels));
    WavRecorderEngine::new(target, profile, device)
}

#[tokio::test]
async fn test_engine_records_valid_wav() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let target = temp_dir.path().join("take.wav");

    let mut engine = tone_engine(target.clone())?;
    let finished_rx = engine.start().await?;
    assert!(engine.is_recording());

    // Capture a few frames of tone
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine.stop().await?;

    let success = tokio::time::timeout(FINISH_TIMEOUT, finished_rx)
        .await
        .expect("timed out waiting for finished signal")?;
    assert!(success, "clean stop should finalize successfully");

    // Verify the file is a readable WAV with the profile's format
    let reader = hound::WavReader::open(&target)?;
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.bits_per_sample, 16);
    assert!(reader.len() > 0, "recording should contain samples");

    Ok(())
}

#[tokio::test]
async fn test_engine_discard_removes_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let target = temp_dir.path().join("discarded.wav");

    let mut engine = tone_engine(target.clone())?;
    let _finished_rx = engine.start().await?;

    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.discard().await?;

    assert!(!target.exists(), "discarded recording should be deleted");
    assert!(!engine.is_recording());

    Ok(())
}

#[tokio::test]
async fn test_engine_discard_before_start_removes_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let target = temp_dir.path().join("unused.wav");

    // Construction opens the target file immediately
    let mut engine = tone_engine(target.clone())?;
    assert!(target.exists());

    engine.discard().await?;
    assert!(!target.exists());

    Ok(())
}

#[tokio::test]
async fn test_engine_construction_fails_for_invalid_path() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let target = temp_dir.path().join("missing").join("take.wav");

    assert!(
        tone_engine(target).is_err(),
        "construction should fail when the parent directory does not exist"
    );

    Ok(())
}

#[tokio::test]
async fn test_metering_reports_levels_for_tone() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let target = temp_dir.path().join("metered.wav");

    let mut engine = tone_engine(target)?;
    engine.set_metering(true);

    let _finished_rx = engine.start().await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let levels = engine.levels();
    assert!(levels.peak > 0.0, "tone should register a peak level");
    assert!(levels.rms > 0.0, "tone should register an RMS level");
    assert!(levels.peak <= 1.0 && levels.rms <= 1.0);

    engine.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_metering_disabled_reports_silence() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let target = temp_dir.path().join("unmetered.wav");

    let mut engine = tone_engine(target)?;
    let _finished_rx = engine.start().await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let levels = engine.levels();
    assert_eq!(levels.rms, 0.0);
    assert_eq!(levels.peak, 0.0);

    engine.stop().await?;
    Ok(())
}
