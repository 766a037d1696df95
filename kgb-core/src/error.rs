//! Domain-specific error types for the KGB codec and container.
//!
//! All fallible operations return `Result<T, KgbError>`.
//! No panics on malformed input; every error is typed so the player can
//! decide whether to skip a frame or give up on the file.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = KgbError> = std::result::Result<T, E>;

/// The canonical error type for the KGB codec.
#[derive(Debug, Error)]
pub enum KgbError {
    // ── Format Errors ────────────────────────────────────────────
    /// The container does not start with the `0xADDA` sentinel.
    #[error("invalid magic bytes: expected 0xADDA, got {0:#06x}")]
    InvalidMagic(u16),

    /// A frame payload carries a kind tag other than keyframe / delta.
    #[error("unknown frame kind tag: {0:#04x}")]
    UnknownFrameKind(u8),

    /// A frame payload could not be parsed.
    #[error("malformed frame: {0}")]
    MalformedFrame(&'static str),

    /// A delta frame does not match the running reconstruction.
    #[error("dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u16, u16),
        actual: (u16, u16),
    },

    /// A delta frame arrived before any keyframe.
    #[error("delta frame without a reference frame")]
    MissingReference,

    /// The frame cannot be expressed in the wire format.
    #[error("unrepresentable frame: {0}")]
    Unrepresentable(String),

    // ── Range Errors ─────────────────────────────────────────────
    /// Requested frame index is past the declared frame count.
    #[error("frame index {index} out of range (frame count {count})")]
    FrameOutOfRange { index: u16, count: u16 },

    /// The container already holds the maximum number of frames.
    #[error("container frame limit reached ({0} frames)")]
    FrameLimit(u16),

    // ── Truncation Errors ────────────────────────────────────────
    /// A declared length reaches past the end of the file.
    #[error("truncated container at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        offset: u64,
        needed: u64,
        available: u64,
    },

    // ── I/O Errors ───────────────────────────────────────────────
    /// The file layer reported an error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A screen or window collaborator failed.
    #[error("platform error: {0}")]
    Platform(String),
}

impl KgbError {
    /// Whether the error only concerns the frame being processed.
    ///
    /// Playback skips such frames and keeps the last good reconstruction.
    /// Platform failures are not frame-local.
    pub fn is_frame_local(&self) -> bool {
        !matches!(self, KgbError::Platform(_))
    }

    /// Whether this is a truncation error.
    pub fn is_truncation(&self) -> bool {
        matches!(self, KgbError::Truncated { .. })
    }
}
