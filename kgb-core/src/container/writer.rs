//! Container writer.
//!
//! Writes the header with a placeholder frame count, appends
//! length-prefixed records as they are produced, and patches the count in
//! [`finish`](ContainerWriter::finish). A writer dropped without finishing
//! leaves the placeholder in place; readers treat that as "count unknown".

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::container::{ContainerHeader, PLACEHOLDER_COUNT, RECORD_PREFIX_LEN};
use crate::error::{KgbError, Result};

/// Appends frame records to a container.
pub struct ContainerWriter<W: Write + Seek> {
    inner: W,
    /// Stream position of the header.
    start: u64,
    frame_count: u16,
    bytes_written: u64,
}

impl ContainerWriter<BufWriter<File>> {
    /// Create (or truncate) the file at `path` and write the header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "container created");
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write + Seek> ContainerWriter<W> {
    /// Start a container at the current position of `inner`.
    pub fn new(mut inner: W) -> Result<Self> {
        let start = inner.stream_position()?;
        let header = ContainerHeader::new(PLACEHOLDER_COUNT).to_bytes();
        inner.write_all(&header)?;
        Ok(Self {
            inner,
            start,
            frame_count: 0,
            bytes_written: header.len() as u64,
        })
    }

    /// Append one record: `[len u32 BE][payload]`, no separator.
    pub fn append_frame(&mut self, payload: &[u8]) -> Result<()> {
        if self.frame_count == u16::MAX {
            return Err(KgbError::FrameLimit(u16::MAX));
        }
        let len = u32::try_from(payload.len()).map_err(|_| {
            KgbError::Unrepresentable(format!("record of {} bytes exceeds 32 bits", payload.len()))
        })?;

        self.inner.write_all(&len.to_be_bytes())?;
        self.inner.write_all(payload)?;

        self.frame_count += 1;
        self.bytes_written += RECORD_PREFIX_LEN + payload.len() as u64;
        Ok(())
    }

    /// Records appended so far.
    pub fn frame_count(&self) -> u16 {
        self.frame_count
    }

    /// Header plus records, in bytes.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Patch the frame count into the header and flush.
    pub fn finish(mut self) -> Result<W> {
        self.inner.seek(SeekFrom::Start(self.start + 2))?;
        self.inner.write_all(&self.frame_count.to_be_bytes())?;
        self.inner.seek(SeekFrom::End(0))?;
        self.inner.flush()?;
        debug!(
            frames = self.frame_count,
            bytes = self.bytes_written,
            "container finished"
        );
        Ok(self.inner)
    }
}
