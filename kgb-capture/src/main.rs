//! KGB Capture: entry point.
//!
//! ```text
//! kgb-capture                        Record with defaults (250 frames to ./KGB)
//! kgb-capture --config <path>        Load a custom config TOML
//! kgb-capture -o clip.kgb -n 100     Override output and frame count
//! kgb-capture --test-pattern         Record generated frames instead of the screen
//! kgb-capture --gen-config           Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kgb_core::CaptureSource;
use kgb_capture::config::{CaptureConfig, SourceKind};
use kgb_capture::screen::{GdiCapturer, TestPattern};
use kgb_capture::service::CaptureService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "kgb-capture", about = "Record the screen into a KGB container")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "kgb-capture.toml")]
    config: PathBuf,

    /// Output container (overrides config).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of frames to record (overrides config).
    #[arg(short = 'n', long)]
    frames: Option<u16>,

    /// Frames per second (overrides config).
    #[arg(long)]
    fps: Option<u8>,

    /// Keyframe every N frames, 0 for the first frame only (overrides config).
    #[arg(short, long)]
    keyframe_interval: Option<u32>,

    /// Record a generated test pattern instead of the screen.
    #[arg(long)]
    test_pattern: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&CaptureConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = CaptureConfig::load(&cli.config);
    if let Some(output) = cli.output {
        config.capture.output = output;
    }
    if let Some(frames) = cli.frames {
        config.capture.frame_count = frames;
    }
    if let Some(fps) = cli.fps {
        config.capture.fps = fps;
    }
    if let Some(interval) = cli.keyframe_interval {
        config.capture.keyframe_interval = interval;
    }
    if cli.test_pattern {
        config.capture.source = SourceKind::TestPattern;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("kgb-capture v{}", env!("CARGO_PKG_VERSION"));
    info!("target FPS: {}", config.capture.fps);
    info!("source: {:?}", config.capture.source);

    let mut source: Box<dyn CaptureSource> = match config.capture.source {
        SourceKind::Screen => {
            let gdi = GdiCapturer::new()?;
            info!("screen: {}x{}", gdi.width(), gdi.height());
            Box::new(gdi)
        }
        SourceKind::TestPattern => Box::new(TestPattern::new(
            config.capture.pattern_width,
            config.capture.pattern_height,
        )),
    };

    let service = CaptureService::new(config.capture.clone());
    let stop = service.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, finishing container");
        stop.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    let summary = service.run(source.as_mut()).await?;
    println!("number of frames recorded : {}", summary.frames);

    Ok(())
}
