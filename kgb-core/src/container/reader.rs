//! Container reader with random access by frame index.
//!
//! Records are located by walking the length prefixes, so reaching record
//! `n` costs `n` prefix reads and no payload decoding. The reader caches the
//! offset of the record after the last one returned: sequential playback
//! pays O(1) per frame, seeking backwards restarts the walk from the header.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::container::{ContainerHeader, HEADER_LEN, RECORD_PREFIX_LEN};
use crate::error::{KgbError, Result};

/// Random-access reader over a container.
pub struct ContainerReader<R: Read + Seek> {
    inner: R,
    header: ContainerHeader,
    /// Declared count, or the scanned one when the header holds the placeholder.
    frame_count: u16,
    /// Stream position of the header.
    start: u64,
    /// Stream length.
    end: u64,
    /// Index and offset of the next record in the walk.
    next_index: u16,
    next_offset: u64,
}

impl ContainerReader<BufReader<File>> {
    /// Open the file at `path` and validate its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "container opened");
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> ContainerReader<R> {
    /// Read the header at the current position of `inner`.
    pub fn new(mut inner: R) -> Result<Self> {
        let start = inner.stream_position()?;
        let end = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(start))?;

        let available = end.saturating_sub(start);
        if available < HEADER_LEN {
            return Err(KgbError::Truncated {
                offset: start,
                needed: HEADER_LEN,
                available,
            });
        }

        let mut raw = [0u8; HEADER_LEN as usize];
        inner.read_exact(&mut raw)?;
        let header = ContainerHeader::from_bytes(raw)?;

        let mut reader = Self {
            inner,
            header,
            frame_count: header.frame_count,
            start,
            end,
            next_index: 0,
            next_offset: start + HEADER_LEN,
        };

        if header.is_placeholder() {
            reader.frame_count = reader.scan_complete_records()?;
            if reader.frame_count > 0 {
                warn!(
                    recovered = reader.frame_count,
                    "container frame count was never written; using scanned count"
                );
            }
        }

        Ok(reader)
    }

    /// Header exactly as stored in the file.
    pub fn header(&self) -> ContainerHeader {
        self.header
    }

    /// Number of readable frames.
    pub fn frame_count(&self) -> u16 {
        self.frame_count
    }

    /// Payload of record `index`.
    pub fn read_frame(&mut self, index: u16) -> Result<Bytes> {
        if index >= self.frame_count {
            return Err(KgbError::FrameOutOfRange {
                index,
                count: self.frame_count,
            });
        }

        if index < self.next_index {
            self.rewind();
        }

        while self.next_index < index {
            let len = self.record_len(self.next_offset)?;
            self.next_offset += RECORD_PREFIX_LEN + len;
            self.next_index += 1;
        }

        let len = self.record_len(self.next_offset)?;
        self.inner
            .seek(SeekFrom::Start(self.next_offset + RECORD_PREFIX_LEN))?;
        let mut payload = vec![0u8; len as usize];
        self.inner.read_exact(&mut payload)?;

        self.next_offset += RECORD_PREFIX_LEN + len;
        self.next_index += 1;
        Ok(Bytes::from(payload))
    }

    fn rewind(&mut self) {
        self.next_index = 0;
        self.next_offset = self.start + HEADER_LEN;
    }

    /// Length of the record at `offset`, checked against the stream end.
    fn record_len(&mut self, offset: u64) -> Result<u64> {
        let available = self.end.saturating_sub(offset);
        if available < RECORD_PREFIX_LEN {
            return Err(KgbError::Truncated {
                offset,
                needed: RECORD_PREFIX_LEN,
                available,
            });
        }

        self.inner.seek(SeekFrom::Start(offset))?;
        let mut prefix = [0u8; RECORD_PREFIX_LEN as usize];
        self.inner.read_exact(&mut prefix)?;
        let len = u32::from_be_bytes(prefix) as u64;

        if available - RECORD_PREFIX_LEN < len {
            return Err(KgbError::Truncated {
                offset: offset + RECORD_PREFIX_LEN,
                needed: len,
                available: available - RECORD_PREFIX_LEN,
            });
        }
        Ok(len)
    }

    /// Count complete records up to end-of-stream (or the first truncated one).
    fn scan_complete_records(&mut self) -> Result<u16> {
        let mut offset = self.start + HEADER_LEN;
        let mut count: u16 = 0;
        while offset < self.end && count < u16::MAX {
            match self.record_len(offset) {
                Ok(len) => {
                    offset += RECORD_PREFIX_LEN + len;
                    count += 1;
                }
                Err(e) if e.is_truncation() => {
                    warn!(offset, "ignoring truncated trailing record");
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerWriter;
    use std::io::Cursor;

    fn container(records: &[&[u8]]) -> Vec<u8> {
        let mut w = ContainerWriter::new(Cursor::new(Vec::new())).unwrap();
        for r in records {
            w.append_frame(r).unwrap();
        }
        w.finish().unwrap().into_inner()
    }

    #[test]
    fn random_and_sequential_access() {
        let bytes = container(&[b"zero", b"one", b"", b"three"]);
        let mut r = ContainerReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(r.frame_count(), 4);

        assert_eq!(&r.read_frame(3).unwrap()[..], b"three");
        assert_eq!(&r.read_frame(0).unwrap()[..], b"zero");
        assert_eq!(&r.read_frame(1).unwrap()[..], b"one");
        assert_eq!(&r.read_frame(2).unwrap()[..], b"");
        assert_eq!(&r.read_frame(1).unwrap()[..], b"one");
    }

    #[test]
    fn out_of_range_index() {
        let bytes = container(&[b"a"]);
        let mut r = ContainerReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(
            r.read_frame(1),
            Err(KgbError::FrameOutOfRange { index: 1, count: 1 })
        ));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = container(&[b"a"]);
        bytes[0] = 0x00;
        assert!(matches!(
            ContainerReader::new(Cursor::new(bytes)),
            Err(KgbError::InvalidMagic(_))
        ));
    }

    #[test]
    fn short_file_is_truncated() {
        assert!(matches!(
            ContainerReader::new(Cursor::new(vec![0xAD, 0xDA, 0])),
            Err(KgbError::Truncated { needed: 4, available: 3, .. })
        ));
    }

    #[test]
    fn truncated_last_record() {
        let mut bytes = container(&[b"first", b"second"]);
        bytes.truncate(bytes.len() - 2);
        let mut r = ContainerReader::new(Cursor::new(bytes)).unwrap();
        assert!(r.read_frame(1).unwrap_err().is_truncation());
        assert_eq!(&r.read_frame(0).unwrap()[..], b"first");
    }

    #[test]
    fn declared_count_past_records_is_truncation() {
        let mut bytes = container(&[b"only"]);
        bytes[3] = 2;
        let mut r = ContainerReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(&r.read_frame(0).unwrap()[..], b"only");
        assert!(r.read_frame(1).unwrap_err().is_truncation());
    }

    #[test]
    fn placeholder_count_is_recovered_by_scanning() {
        let mut bytes = container(&[b"a", b"bb", b"ccc"]);
        bytes[2] = 0;
        bytes[3] = 0;
        // Half-written fourth record.
        bytes.extend_from_slice(&[0, 0, 0, 9, 1, 2]);

        let mut r = ContainerReader::new(Cursor::new(bytes)).unwrap();
        assert!(r.header().is_placeholder());
        assert_eq!(r.frame_count(), 3);
        assert_eq!(&r.read_frame(2).unwrap()[..], b"ccc");
    }

    #[test]
    fn empty_container() {
        let bytes = container(&[]);
        let mut r = ContainerReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(r.frame_count(), 0);
        assert!(r.read_frame(0).is_err());
    }
}
