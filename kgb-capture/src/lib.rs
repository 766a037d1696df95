//! # kgb-capture: KGB Screen Recorder
//!
//! Captures the primary display at a fixed frame rate, converts every
//! frame to RGB565, encodes it as a keyframe or XOR delta and appends it
//! to a KGB container.
//!
//! ## Sources
//!
//! - **Screen**: GDI `BitBlt` of the primary display (Windows only).
//! - **Test pattern**: generated frames, for trying the pipeline anywhere.

pub mod config;
pub mod screen;
pub mod service;
