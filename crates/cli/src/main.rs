use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use clap::Parser;

use facemood_core::detection::domain::face_detector::FaceExpressionDetector;
use facemood_core::detection::infrastructure::onnx_expression_detector::OnnxExpressionDetector;
use facemood_core::overlay::domain::overlay_renderer::OverlayRenderer;
use facemood_core::overlay::infrastructure::console_badge_renderer::ConsoleBadgeRenderer;
use facemood_core::overlay::infrastructure::snapshot_renderer::SnapshotRenderer;
use facemood_core::pipeline::detection_executor::{DetectionExecutor, InlineDetectionExecutor};
use facemood_core::pipeline::infrastructure::threaded_detection_executor::ThreadedDetectionExecutor;
use facemood_core::pipeline::live_expression_use_case::{
    load_detector, open_source, LiveExpressionSession,
};
use facemood_core::pipeline::session_logger::StdoutSessionLogger;
use facemood_core::pipeline::session_status::SessionError;
use facemood_core::shared::constants::{
    DEFAULT_MIN_CONFIDENCE, DEFAULT_SMOOTHING, DEFAULT_UPDATE_MS, DETECTOR_INPUT_SIZE,
};
use facemood_core::shared::model_resolver::{resolve_models, ModelSource, ProgressFn};
use facemood_core::shared::settings::{FixedSettings, JsonFileSettings, Settings, SettingsSource};
use facemood_core::video::domain::video_reader::VideoSource;
use facemood_core::video::infrastructure::ffmpeg_reader::FfmpegReader;

/// Directory searched for self-hosted models before downloading.
const BUNDLED_MODELS_DIR: &str = "models";

/// Live facial expression recognition from a camera or video file.
#[derive(Parser)]
#[command(name = "facemood")]
struct Cli {
    /// Camera device (e.g. /dev/video0, 0, "video=Integrated Camera") or video file.
    #[arg(default_value = "/dev/video0")]
    source: String,

    /// Device input format for cameras (v4l2, avfoundation, dshow).
    #[arg(long)]
    input_format: Option<String>,

    /// Smoothing coefficient: weight of the previous smoothed score.
    #[arg(long, default_value_t = DEFAULT_SMOOTHING)]
    smoothing: f64,

    /// Minimum face detector score.
    #[arg(long, default_value_t = DEFAULT_MIN_CONFIDENCE)]
    min_confidence: f64,

    /// Milliseconds between detection cycles (minimum 30, 0 = default).
    #[arg(long, default_value_t = DEFAULT_UPDATE_MS)]
    update_ms: u64,

    /// JSON settings file re-read on every cycle; overrides the flags above.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Model location: a directory or an http(s) base URL.
    #[arg(long)]
    models: Option<String>,

    /// Square input resolution for the face detector.
    #[arg(long, default_value_t = DETECTOR_INPUT_SIZE)]
    input_size: u32,

    /// Write the annotated frame to this PNG on every face cycle.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Run detection on the frame loop thread instead of a worker.
    #[arg(long)]
    inline_detection: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mut logger = Box::new(StdoutSessionLogger::default());

    let source = video_source(&cli);
    let mut reader = FfmpegReader::new();
    let metadata = open_source(&mut reader, &source, logger.as_mut())?;
    log::info!(
        "Opened {}: {}x{} @ {:.1} fps ({})",
        metadata.source,
        metadata.width,
        metadata.height,
        metadata.fps,
        metadata.codec
    );

    let model_source = cli
        .models
        .as_deref()
        .map(ModelSource::parse)
        .unwrap_or(ModelSource::Default);
    let detector = load_detector(|| build_detector(&model_source), logger.as_mut())?;

    let executor: Box<dyn DetectionExecutor> = if cli.inline_detection {
        Box::new(InlineDetectionExecutor::new(detector))
    } else {
        Box::new(ThreadedDetectionExecutor::new(detector))
    };

    let mut renderers: Vec<Box<dyn OverlayRenderer>> = vec![Box::new(ConsoleBadgeRenderer::stderr())];
    if let Some(path) = &cli.snapshot {
        renderers.push(Box::new(SnapshotRenderer::new(Some(path.clone()))));
    }

    let mut session = LiveExpressionSession::new(
        executor,
        settings_source(&cli),
        renderers,
        logger,
    )
    .with_input_size(cli.input_size);

    let cancelled = Arc::new(AtomicBool::new(false));
    watch_ctrl_c(cancelled.clone())?;
    let frames = session.run(&mut reader, &cancelled, cli.max_frames)?;
    eprintln!();

    log::info!(
        "Processed {frames} frames, {} detection cycles, {} busy skips",
        session.cycles(),
        session.busy_skips()
    );
    Ok(())
}

fn build_detector(
    source: &ModelSource,
) -> Result<Box<dyn FaceExpressionDetector>, SessionError> {
    log::info!("Resolving models from {source:?}");
    let progress: &ProgressFn = &download_progress;
    let paths = resolve_models(source, Some(Path::new(BUNDLED_MODELS_DIR)), Some(progress))?;
    eprintln!();

    let detector =
        OnnxExpressionDetector::new(&paths).map_err(|e| SessionError::ModelLoad(e.to_string()))?;
    Ok(Box::new(detector))
}

fn settings_source(cli: &Cli) -> Box<dyn SettingsSource> {
    let initial = Settings {
        smoothing: cli.smoothing,
        min_confidence: cli.min_confidence,
        update_ms: cli.update_ms,
    };
    match &cli.settings {
        Some(path) => {
            log::info!("Watching settings file {}", path.display());
            Box::new(JsonFileSettings::new(path.clone(), initial))
        }
        None => Box::new(FixedSettings(initial)),
    }
}

fn video_source(cli: &Cli) -> VideoSource {
    match VideoSource::detect(&cli.source) {
        VideoSource::Camera { device, .. } => VideoSource::Camera {
            device,
            format: cli.input_format.clone(),
        },
        file => file,
    }
}

/// Sets `cancelled` on the first Ctrl+C so the session can drain and print
/// its summary. A second Ctrl+C exits immediately.
fn watch_ctrl_c(cancelled: Arc<AtomicBool>) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            runtime.block_on(wait_for_ctrl_c(&cancelled));
        })?;
    Ok(())
}

async fn wait_for_ctrl_c(cancelled: &AtomicBool) {
    if tokio::signal::ctrl_c().await.is_err() {
        log::warn!("Could not listen for Ctrl+C");
        return;
    }
    log::info!("Received Ctrl+C, stopping...");
    cancelled.store(true, Ordering::SeqCst);

    if tokio::signal::ctrl_c().await.is_ok() {
        process::exit(130);
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.input_size == 0 {
        return Err("Input size must be positive".into());
    }
    if cli.max_frames == Some(0) {
        return Err("--max-frames must be at least 1".into());
    }
    if cli.input_format.is_some() && !VideoSource::detect(&cli.source).is_camera() {
        return Err("--input-format only applies to camera sources".into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}
