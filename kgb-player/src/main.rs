//! KGB Player: entry point.
//!
//! ```text
//! kgb-player <file>               Play a container in a window
//! kgb-player                      Ask for the file name on stdin
//! kgb-player <file> --once        Stop after the last frame
//! kgb-player <file> --headless    Decode without a window
//! kgb-player --gen-config         Dump default config and exit
//! ```

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tokio::time::{MissedTickBehavior, interval};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kgb_core::{KgbError, Player, Tick};

use kgb_player::config::PlayerConfig;
use kgb_player::display::{GdiDisplay, HeadlessSink};
use kgb_player::window::{NativeWindow, WindowEvent};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "kgb-player", about = "Play back a KGB screen recording")]
struct Cli {
    /// Container to play. Read from stdin when omitted.
    file: Option<PathBuf>,

    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "kgb-player.toml")]
    config: PathBuf,

    /// Frames per second (overrides config).
    #[arg(long)]
    fps: Option<u8>,

    /// Play once instead of looping.
    #[arg(long)]
    once: bool,

    /// Decode and pace frames without opening a window.
    #[arg(long)]
    headless: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

fn prompt_for_file() -> std::io::Result<PathBuf> {
    print!("file to play: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(PathBuf::from(line.trim()))
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&PlayerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = PlayerConfig::load(&cli.config);
    if let Some(fps) = cli.fps {
        config.playback.fps = fps;
    }
    if cli.once {
        config.playback.loop_playback = false;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("kgb-player v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Open the container ───────────────────────────────────

    let path = match cli.file {
        Some(path) => path,
        None => prompt_for_file()?,
    };
    let mut player = Player::open(&path, config.playback.loop_playback)?;
    if player.frame_count() == 0 {
        return Err(KgbError::MalformedFrame("container holds no frames").into());
    }
    info!("{}: {} frames", path.display(), player.frame_count());

    let running = Arc::new(AtomicBool::new(true));
    let ctrlc_running = running.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        ctrlc_running.store(false, Ordering::SeqCst);
    });

    let mut ticker = interval(config.playback.frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // ── 2. Playback loop ────────────────────────────────────────

    if cli.headless {
        let mut sink = HeadlessSink::default();
        while running.load(Ordering::SeqCst) {
            ticker.tick().await;
            if player.step(&mut sink)? == Tick::Finished {
                break;
            }
        }
    } else {
        let window = NativeWindow::create(
            &config.display.title,
            config.display.width,
            config.display.height,
        )?;
        let mut display =
            GdiDisplay::new(window.hwnd(), config.display.width, config.display.height);

        'playback: while running.load(Ordering::SeqCst) {
            ticker.tick().await;

            for ev in window.poll_events() {
                match ev {
                    WindowEvent::Close => break 'playback,
                    WindowEvent::Resize(w, h) => display.resize(w, h),
                }
            }

            if player.step(&mut display)? == Tick::Finished {
                break;
            }
        }
    }

    // ── 3. Shutdown ─────────────────────────────────────────────

    let stats = player.stats();
    info!(
        presented = stats.presented,
        skipped = stats.skipped,
        loops = stats.loops,
        "playback finished"
    );

    Ok(())
}
