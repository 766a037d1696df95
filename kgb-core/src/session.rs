//! Capture and playback pipelines.
//!
//! ```text
//! record:   CaptureSource → pack_frame → FrameEncoder → ContainerWriter
//! playback: ContainerReader → FrameDecoder → expand_into_bgr24 → DisplaySink
//! ```
//!
//! Both drivers are synchronous and handle exactly one frame per call; the
//! caller owns the pacing loop. The screen and the window are reached only
//! through the [`CaptureSource`] and [`DisplaySink`] traits.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::container::{ContainerReader, ContainerWriter};
use crate::error::Result;
use crate::frame::{FrameDecoder, FrameEncoder, FrameKind};
use crate::pixel::{expand_into_bgr24, pack_frame};
use crate::types::RawScreenFrame;

// ── Collaborators ────────────────────────────────────────────────

/// Something that can hand over the current screen contents.
pub trait CaptureSource {
    fn capture(&mut self) -> Result<RawScreenFrame>;
}

/// Something that can show a tightly packed BGR24 image.
pub trait DisplaySink {
    fn present(&mut self, bgr: &[u8], width: u32, height: u32) -> Result<()>;
}

// ── Recorder ─────────────────────────────────────────────────────

/// Totals reported when a recording is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingSummary {
    pub frames: u16,
    pub keyframes: u64,
    pub delta_frames: u64,
    /// Container size including header and length prefixes.
    pub bytes_written: u64,
}

/// Encodes captured frames into a container.
pub struct Recorder<W: Write + Seek> {
    encoder: FrameEncoder,
    writer: ContainerWriter<W>,
}

impl Recorder<BufWriter<File>> {
    /// Record into a new file at `path`.
    pub fn create(path: impl AsRef<Path>, keyframe_interval: u32) -> Result<Self> {
        Ok(Self::new(ContainerWriter::create(path)?, keyframe_interval))
    }
}

impl<W: Write + Seek> Recorder<W> {
    pub fn new(writer: ContainerWriter<W>, keyframe_interval: u32) -> Self {
        Self {
            encoder: FrameEncoder::new(keyframe_interval),
            writer,
        }
    }

    /// Pack, encode and append one captured frame.
    pub fn record_frame(&mut self, raw: &RawScreenFrame) -> Result<FrameKind> {
        let packed = pack_frame(raw)?;
        let encoded = self.encoder.encode(packed)?;
        self.writer.append_frame(&encoded.payload)?;
        debug!(
            index = self.writer.frame_count() - 1,
            kind = ?encoded.kind,
            bytes = encoded.payload.len(),
            "frame recorded"
        );
        Ok(encoded.kind)
    }

    /// Capture one frame from `source` and record it.
    pub fn capture_from(&mut self, source: &mut dyn CaptureSource) -> Result<FrameKind> {
        let raw = source.capture()?;
        self.record_frame(&raw)
    }

    pub fn frames_recorded(&self) -> u16 {
        self.writer.frame_count()
    }

    /// Patch the header and return the underlying writer with totals.
    pub fn finish(self) -> Result<(W, RecordingSummary)> {
        let stats = self.encoder.stats();
        let summary = RecordingSummary {
            frames: self.writer.frame_count(),
            keyframes: stats.keyframes,
            delta_frames: stats.delta_frames,
            bytes_written: self.writer.bytes_written(),
        };
        let inner = self.writer.finish()?;
        Ok((inner, summary))
    }
}

// ── Player ───────────────────────────────────────────────────────

/// Outcome of one playback tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Frame `index` was decoded and presented.
    Presented(u16),
    /// Frame `index` failed to read or decode and was skipped; the last good
    /// image stays on screen.
    Skipped(u16),
    /// No more frames (only when not looping).
    Finished,
}

/// Counters kept by [`Player`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    pub presented: u64,
    pub skipped: u64,
    pub loops: u64,
}

/// Reads, decodes and presents frames in order.
pub struct Player<R: Read + Seek> {
    reader: ContainerReader<R>,
    decoder: FrameDecoder,
    next_index: u16,
    looping: bool,
    /// BGR24 scratch buffer reused across frames.
    rgb: Vec<u8>,
    stats: PlaybackStats,
}

impl Player<BufReader<File>> {
    /// Open the container at `path` for playback.
    pub fn open(path: impl AsRef<Path>, looping: bool) -> Result<Self> {
        Ok(Self::new(ContainerReader::open(path)?, looping))
    }
}

impl<R: Read + Seek> Player<R> {
    pub fn new(reader: ContainerReader<R>, looping: bool) -> Self {
        Self {
            reader,
            decoder: FrameDecoder::new(),
            next_index: 0,
            looping,
            rgb: Vec::new(),
            stats: PlaybackStats::default(),
        }
    }

    pub fn frame_count(&self) -> u16 {
        self.reader.frame_count()
    }

    pub fn stats(&self) -> PlaybackStats {
        self.stats
    }

    /// Process the next frame.
    ///
    /// Frame-local failures (format, range, truncation, read errors) are
    /// logged and reported as [`Tick::Skipped`]. Errors from the sink are
    /// returned.
    pub fn step(&mut self, sink: &mut dyn DisplaySink) -> Result<Tick> {
        if self.next_index >= self.reader.frame_count() {
            if !self.looping || self.reader.frame_count() == 0 {
                return Ok(Tick::Finished);
            }
            self.next_index = 0;
            self.decoder.reset();
            self.stats.loops += 1;
        }

        let index = self.next_index;
        self.next_index += 1;

        let decoded = match self.reader.read_frame(index) {
            Ok(payload) => self.decoder.apply(&payload),
            Err(e) => Err(e),
        };

        match decoded {
            Ok(frame) => {
                expand_into_bgr24(frame, &mut self.rgb);
                sink.present(&self.rgb, frame.width() as u32, frame.height() as u32)?;
                self.stats.presented += 1;
                Ok(Tick::Presented(index))
            }
            Err(e) if e.is_frame_local() => {
                warn!(index, "skipping frame: {e}");
                self.stats.skipped += 1;
                Ok(Tick::Skipped(index))
            }
            Err(e) => Err(e),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KgbError;
    use crate::types::PixelFormat;
    use std::io::Cursor;

    struct ScriptedSource {
        frames: Vec<RawScreenFrame>,
    }

    impl CaptureSource for ScriptedSource {
        fn capture(&mut self) -> Result<RawScreenFrame> {
            if self.frames.is_empty() {
                return Err(KgbError::Platform("source exhausted".into()));
            }
            Ok(self.frames.remove(0))
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        shown: Vec<(Vec<u8>, u32, u32)>,
    }

    impl DisplaySink for CollectingSink {
        fn present(&mut self, bgr: &[u8], width: u32, height: u32) -> Result<()> {
            self.shown.push((bgr.to_vec(), width, height));
            Ok(())
        }
    }

    fn solid(w: u32, h: u32, bgr: [u8; 3]) -> RawScreenFrame {
        let data = bgr.iter().copied().cycle().take((w * h * 3) as usize).collect();
        RawScreenFrame::tight(w, h, PixelFormat::Bgr8, data)
    }

    fn record(frames: Vec<RawScreenFrame>) -> (Vec<u8>, RecordingSummary) {
        let writer = ContainerWriter::new(Cursor::new(Vec::new())).unwrap();
        let mut rec = Recorder::new(writer, 0);
        let mut source = ScriptedSource { frames };
        while rec.capture_from(&mut source).is_ok() {}
        let (cursor, summary) = rec.finish().unwrap();
        (cursor.into_inner(), summary)
    }

    #[test]
    fn record_then_play() {
        let mut second = solid(4, 2, [0, 0, 0xFF]);
        second.data[0..3].copy_from_slice(&[0xFF, 0, 0]);
        let (bytes, summary) = record(vec![solid(4, 2, [0, 0, 0xFF]), second]);

        assert_eq!(summary.frames, 2);
        assert_eq!(summary.keyframes, 1);
        assert_eq!(summary.delta_frames, 1);
        assert_eq!(summary.bytes_written, bytes.len() as u64);

        let reader = ContainerReader::new(Cursor::new(bytes)).unwrap();
        let mut player = Player::new(reader, false);
        let mut sink = CollectingSink::default();

        assert_eq!(player.step(&mut sink).unwrap(), Tick::Presented(0));
        assert_eq!(player.step(&mut sink).unwrap(), Tick::Presented(1));
        assert_eq!(player.step(&mut sink).unwrap(), Tick::Finished);

        let (first_img, w, h) = &sink.shown[0];
        assert_eq!((*w, *h), (4, 2));
        assert!(first_img.chunks(3).all(|px| px == [0, 0, 0xF8]));

        let (second_img, _, _) = &sink.shown[1];
        assert_eq!(&second_img[0..3], &[0xF8, 0, 0]);
        assert!(second_img[3..].chunks(3).all(|px| px == [0, 0, 0xF8]));
    }

    #[test]
    fn looping_wraps_to_first_frame() {
        let (bytes, _) = record(vec![solid(2, 2, [1, 2, 3]), solid(2, 2, [9, 9, 9])]);
        let reader = ContainerReader::new(Cursor::new(bytes)).unwrap();
        let mut player = Player::new(reader, true);
        let mut sink = CollectingSink::default();

        let ticks: Vec<Tick> = (0..5).map(|_| player.step(&mut sink).unwrap()).collect();
        assert_eq!(
            ticks,
            vec![
                Tick::Presented(0),
                Tick::Presented(1),
                Tick::Presented(0),
                Tick::Presented(1),
                Tick::Presented(0),
            ]
        );
        assert_eq!(player.stats().loops, 2);
    }

    #[test]
    fn corrupt_frame_is_skipped_and_last_image_kept() {
        let writer = ContainerWriter::new(Cursor::new(Vec::new())).unwrap();
        let mut rec = Recorder::new(writer, 0);
        rec.record_frame(&solid(2, 1, [0, 0, 0xFF])).unwrap();
        let (cursor, _) = rec.finish().unwrap();
        let mut bytes = cursor.into_inner();

        // Append a record with an unknown kind tag and bump the count.
        bytes.extend_from_slice(&[0, 0, 0, 5, 9, 0, 2, 0, 1]);
        bytes[3] = 2;

        let reader = ContainerReader::new(Cursor::new(bytes)).unwrap();
        let mut player = Player::new(reader, false);
        let mut sink = CollectingSink::default();

        assert_eq!(player.step(&mut sink).unwrap(), Tick::Presented(0));
        assert_eq!(player.step(&mut sink).unwrap(), Tick::Skipped(1));
        assert_eq!(player.step(&mut sink).unwrap(), Tick::Finished);
        assert_eq!(sink.shown.len(), 1);
        assert_eq!(player.stats().skipped, 1);
    }

    #[test]
    fn empty_container_finishes_even_when_looping() {
        let (bytes, _) = record(Vec::new());
        let reader = ContainerReader::new(Cursor::new(bytes)).unwrap();
        let mut player = Player::new(reader, true);
        let mut sink = CollectingSink::default();
        assert_eq!(player.step(&mut sink).unwrap(), Tick::Finished);
    }
}
