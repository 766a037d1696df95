//! Player configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the player.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Playback settings.
    pub playback: PlaybackConfig,
    /// Window settings.
    pub display: DisplayConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Playback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Frames per second.
    pub fps: u8,
    /// Wrap to the first frame after the last one.
    pub loop_playback: bool,
}

/// Window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Window title.
    pub title: String,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fps: 24,
            loop_playback: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "KGB Player".into(),
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

impl PlayerConfig {
    /// Load from a TOML file, falling back to defaults.
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

impl PlaybackConfig {
    /// Time between two frames; fps is clamped to 1..=60.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.clamp(1, 60) as f64)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = PlayerConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("loop_playback"));
        assert!(text.contains("title"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = PlayerConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: PlayerConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.display.width, 1280);
        assert_eq!(parsed.playback.fps, 24);
        assert!(parsed.playback.loop_playback);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let parsed: PlayerConfig = toml::from_str("[playback]\nfps = 10\n").unwrap();
        assert_eq!(parsed.playback.fps, 10);
        assert!(parsed.playback.loop_playback);
        assert_eq!(parsed.display.title, "KGB Player");
    }

    #[test]
    fn frame_interval_clamps() {
        let mut cfg = PlaybackConfig::default();
        cfg.fps = 0;
        assert_eq!(cfg.frame_interval(), Duration::from_secs(1));
        cfg.fps = 255;
        assert_eq!(cfg.frame_interval(), Duration::from_secs_f64(1.0 / 60.0));
    }
}
