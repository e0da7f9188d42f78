use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use voxnote::{CaptureConfig, CaptureManager, Config};

/// Record a short clip with the capture session manager
#[derive(Parser)]
#[command(name = "voxnote", version)]
struct Args {
    /// Path to the config file (without extension)
    #[arg(long, default_value = "config/voxnote")]
    config: String,

    /// Recording file name, resolved under the recordings directory
    #[arg(long)]
    file: Option<String>,

    /// How long to record, in seconds
    #[arg(long, default_value_t = 3)]
    duration_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v0.1.0", cfg.service.name);
    info!("Recordings directory: {}", cfg.storage.recordings_dir);

    let manager = CaptureManager::with_defaults(CaptureConfig::new(&cfg.storage.recordings_dir));

    if !manager.request_permission().await {
        warn!("Microphone permission denied, exiting");
        return Ok(());
    }

    // Completion arrives on the manager's runtime; forward it to main
    let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel();
    manager.set_on_finish(move |result| {
        let _ = done_tx.send(result);
    });

    let file_name = args.file.unwrap_or(cfg.storage.default_file_name);
    manager.start_recording(&file_name).await;

    if manager.is_recording() {
        info!("Recording for {}s...", args.duration_secs);
        tokio::time::sleep(Duration::from_secs(args.duration_secs)).await;

        if let Some(levels) = manager.current_levels().await {
            info!("Levels: rms={:.3}, peak={:.3}", levels.rms, levels.peak);
        }

        manager.stop_recording().await;
    }

    match tokio::time::timeout(Duration::from_secs(5), done_rx.recv()).await {
        Ok(Some(Some(path))) => info!("Recording saved to {:?}", path),
        Ok(Some(None)) => warn!("Recording did not produce a file"),
        _ => warn!("No completion signal received"),
    }

    Ok(())
}
