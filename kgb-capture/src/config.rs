//! Configuration for the recorder.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Recording settings.
    pub capture: RecordingConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Where frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// The primary display (Windows GDI).
    Screen,
    /// A generated moving pattern; works on every platform.
    TestPattern,
}

/// Recording settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Output container path.
    pub output: PathBuf,
    /// Number of frames to record.
    pub frame_count: u16,
    /// Target frames per second.
    pub fps: u8,
    /// Keyframe every N frames (0 = only the first frame).
    pub keyframe_interval: u32,
    /// Frame source.
    pub source: SourceKind,
    /// Test pattern size (ignored for the screen source).
    pub pattern_width: u16,
    pub pattern_height: u16,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("KGB"),
            frame_count: 250,
            fps: 24,
            keyframe_interval: 0,
            source: SourceKind::Screen,
            pattern_width: 320,
            pattern_height: 240,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl CaptureConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }
}

impl RecordingConfig {
    /// Time between two captures; fps is clamped to 1..=60.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.clamp(1, 60) as f64)
    }
}

// ── Tests ────────────────────────────────────────────────────────
