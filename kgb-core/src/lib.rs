//! # kgb-core
//!
//! Frame codec and container format for the KGB screen recorder.
//!
//! This crate contains:
//! - **Pixel codec**: RGB888 ⇄ RGB565 conversion (`pixel`)
//! - **Frame codec**: keyframe and chunked XOR delta records (`frame`)
//! - **Container**: header plus length-prefixed records with random access (`container`)
//! - **Session**: `Recorder` / `Player` pipelines over pluggable capture and display collaborators
//! - **Error**: `KgbError`, a typed, `thiserror`-based error hierarchy

pub mod container;
pub mod error;
pub mod frame;
pub mod pixel;
pub mod session;
pub mod types;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use container::{
    ContainerHeader, ContainerReader, ContainerWriter, MAGIC, read_frame, read_header,
};
pub use error::{KgbError, Result};
pub use frame::{
    Chunk, EncoderStats, FrameDecoder, FrameEncoder, FrameKind, FramePayload, apply_delta,
    apply_keyframe, encode_delta, encode_keyframe,
};
pub use pixel::{Rgb24, expand_into_bgr24, pack_frame, to_expanded, to_packed};
pub use session::{
    CaptureSource, DisplaySink, PlaybackStats, Player, Recorder, RecordingSummary, Tick,
};
pub use types::{PackedFrame, PixelFormat, RawScreenFrame};
