//! The KGB container file.
//!
//! ```text
//! offset 0   magic        0xAD 0xDA
//! offset 2   frame_count  u16 BE (0 until the writer is finished)
//! offset 4…  records      [len u32 BE][payload; len] repeated
//! ```
//!
//! Records carry opaque payloads; their meaning belongs to [`crate::frame`].
//! Any number of leading records can be skipped using the length prefix
//! alone, which is what makes random access possible.

pub mod reader;
pub mod writer;

use std::path::Path;

use bytes::Bytes;

use crate::error::{KgbError, Result};

pub use reader::ContainerReader;
pub use writer::ContainerWriter;

/// File sentinel.
pub const MAGIC: [u8; 2] = [0xAD, 0xDA];

/// Size of the file header in bytes.
pub const HEADER_LEN: u64 = 4;

/// Size of a record's length prefix in bytes.
pub const RECORD_PREFIX_LEN: u64 = 4;

/// Frame count written on creation, patched by [`ContainerWriter::finish`].
pub const PLACEHOLDER_COUNT: u16 = 0;

// ── ContainerHeader ──────────────────────────────────────────────

/// The 4-byte header at the start of every container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub magic: [u8; 2],
    pub frame_count: u16,
}

impl ContainerHeader {
    pub fn new(frame_count: u16) -> Self {
        Self {
            magic: MAGIC,
            frame_count,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN as usize] {
        let count = self.frame_count.to_be_bytes();
        [self.magic[0], self.magic[1], count[0], count[1]]
    }

    /// Parse and validate the header bytes.
    pub fn from_bytes(bytes: [u8; HEADER_LEN as usize]) -> Result<Self> {
        if bytes[0..2] != MAGIC {
            return Err(KgbError::InvalidMagic(u16::from_be_bytes([
                bytes[0], bytes[1],
            ])));
        }
        Ok(Self {
            magic: MAGIC,
            frame_count: u16::from_be_bytes([bytes[2], bytes[3]]),
        })
    }

    /// Whether the count is still the creation placeholder (the writer was
    /// never finished, or nothing was recorded).
    pub fn is_placeholder(&self) -> bool {
        self.frame_count == PLACEHOLDER_COUNT
    }
}

// ── Path-based helpers ───────────────────────────────────────────

/// Read and validate the header of the container at `path`.
pub fn read_header(path: impl AsRef<Path>) -> Result<ContainerHeader> {
    Ok(ContainerReader::open(path)?.header())
}

/// Extract the payload of record `index` from the container at `path`.
///
/// Walks the records from the start of the file; O(index). Use a
/// [`ContainerReader`] for repeated access.
pub fn read_frame(path: impl AsRef<Path>, index: u16) -> Result<Bytes> {
    ContainerReader::open(path)?.read_frame(index)
}
