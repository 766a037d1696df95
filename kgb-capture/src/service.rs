//! Recording service.
//!
//! Drives the capture pipeline at a fixed rate:
//!
//! 1. A [`CaptureSource`] hands over the screen.
//! 2. The [`Recorder`] packs, encodes and appends the frame.
//! 3. The loop waits for the next tick.
//!
//! Every tick records exactly one frame; late ticks are delayed, never
//! bursted or coalesced. The container header is patched even when the loop
//! stops early (Ctrl-C or a capture failure).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use kgb_core::{CaptureSource, KgbError, Recorder, RecordingSummary};

use crate::config::RecordingConfig;

/// Fixed-rate capture loop writing one container.
pub struct CaptureService {
    config: RecordingConfig,
    running: Arc<AtomicBool>,
}

impl CaptureService {
    pub fn new(config: RecordingConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// A handle that stops the loop after the current frame when set to `false`.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Record `frame_count` frames from `source` into the configured output.
    pub async fn run(
        &self,
        source: &mut dyn CaptureSource,
    ) -> Result<RecordingSummary, KgbError> {
        let mut recorder = Recorder::create(&self.config.output, self.config.keyframe_interval)?;
        info!(
            "recording {} frames to {}",
            self.config.frame_count,
            self.config.output.display()
        );

        let outcome = self.record_loop(&mut recorder, source).await;
        let (_, summary) = recorder.finish()?;
        outcome?;

        info!(
            frames = summary.frames,
            keyframes = summary.keyframes,
            delta_frames = summary.delta_frames,
            bytes = summary.bytes_written,
            "recording finished"
        );
        Ok(summary)
    }

    async fn record_loop<W: std::io::Write + std::io::Seek>(
        &self,
        recorder: &mut Recorder<W>,
        source: &mut dyn CaptureSource,
    ) -> Result<(), KgbError> {
        let mut ticker = interval(self.config.frame_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for _ in 0..self.config.frame_count {
            ticker.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                warn!(
                    "stopped after {} of {} frames",
                    recorder.frames_recorded(),
                    self.config.frame_count
                );
                break;
            }
            recorder.capture_from(source)?;
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
