//! # kgb-player: KGB Player
//!
//! Opens a KGB container, reconstructs every frame with the keyframe and
//! delta decoder and shows it in a native Win32 window at a fixed rate,
//! looping back to the first frame after the last one.

pub mod config;
pub mod display;
pub mod window;
