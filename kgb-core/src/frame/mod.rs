//! Frame records: the payload carried by each container record.
//!
//! ## Wire format (all integers big-endian)
//!
//! ```text
//! keyframe:  tag=0 | width u16 | height u16 | pixel u16 × (width·height)
//! delta:     tag=1 | width u16 | height u16 | chunk_count u16 | chunk*
//! chunk:     skip_count u16 | delta_count u16 | xor u16 × delta_count
//! ```
//!
//! [`FramePayload`] is the typed form of one record. The encoder builds it
//! and serialises it; the decoder parses and validates it completely before
//! any pixel of the reconstruction is touched.

pub mod decoder;
pub mod encoder;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{KgbError, Result};
use crate::types::PackedFrame;

pub use decoder::{FrameDecoder, apply_delta, apply_keyframe};
pub use encoder::{EncoderStats, FrameEncoder, encode_delta, encode_keyframe};

/// Bytes before the pixel data of a keyframe: tag + width + height.
pub const FRAME_HEADER_LEN: usize = 5;

/// Bytes of a chunk header: skip count + delta count.
const CHUNK_HEADER_LEN: usize = 4;

// ── FrameKind ────────────────────────────────────────────────────

/// Kind tag stored in byte 0 of every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    Keyframe = 0,
    Delta = 1,
}

impl TryFrom<u8> for FrameKind {
    type Error = KgbError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(FrameKind::Keyframe),
            1 => Ok(FrameKind::Delta),
            other => Err(KgbError::UnknownFrameKind(other)),
        }
    }
}

impl FrameKind {
    /// Read the kind tag of a serialised payload without parsing the rest.
    pub fn of(payload: &[u8]) -> Result<Self> {
        let tag = payload
            .first()
            .copied()
            .ok_or(KgbError::MalformedFrame("empty payload"))?;
        Self::try_from(tag)
    }
}

// ── Chunk ────────────────────────────────────────────────────────

/// Skip `skip_count` unchanged pixels, then XOR the next `deltas.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub skip_count: u16,
    pub deltas: Vec<u16>,
}

impl Chunk {
    /// Pixels this chunk moves the cursor forward by.
    pub fn span(&self) -> usize {
        self.skip_count as usize + self.deltas.len()
    }
}

// ── FramePayload ─────────────────────────────────────────────────

/// Typed form of one frame record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePayload {
    /// Self-contained snapshot.
    Keyframe(PackedFrame),
    /// XOR corrections against the previous reconstruction.
    Delta {
        width: u16,
        height: u16,
        chunks: Vec<Chunk>,
    },
}

impl FramePayload {
    pub fn kind(&self) -> FrameKind {
        match self {
            FramePayload::Keyframe(_) => FrameKind::Keyframe,
            FramePayload::Delta { .. } => FrameKind::Delta,
        }
    }

    /// `(width, height)` declared by the payload.
    pub fn dimensions(&self) -> (u16, u16) {
        match self {
            FramePayload::Keyframe(frame) => frame.dimensions(),
            FramePayload::Delta { width, height, .. } => (*width, *height),
        }
    }

    /// Exact serialised size in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            FramePayload::Keyframe(frame) => FRAME_HEADER_LEN + 2 * frame.len(),
            FramePayload::Delta { chunks, .. } => {
                FRAME_HEADER_LEN
                    + 2
                    + chunks
                        .iter()
                        .map(|c| CHUNK_HEADER_LEN + 2 * c.deltas.len())
                        .sum::<usize>()
            }
        }
    }

    /// Serialise to wire bytes.
    ///
    /// Fails if a delta frame holds more than `u16::MAX` chunks, or a chunk
    /// more than `u16::MAX` deltas.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut out = BytesMut::with_capacity(self.encoded_len());
        let (width, height) = self.dimensions();
        out.put_u8(self.kind() as u8);
        out.put_u16(width);
        out.put_u16(height);

        match self {
            FramePayload::Keyframe(frame) => put_pixels(&mut out, frame),
            FramePayload::Delta { chunks, .. } => {
                let chunk_count = u16::try_from(chunks.len()).map_err(|_| {
                    KgbError::Unrepresentable(format!("{} chunks exceed 16 bits", chunks.len()))
                })?;
                out.put_u16(chunk_count);
                for chunk in chunks {
                    let delta_count = u16::try_from(chunk.deltas.len()).map_err(|_| {
                        KgbError::Unrepresentable(format!(
                            "{} deltas in one chunk exceed 16 bits",
                            chunk.deltas.len()
                        ))
                    })?;
                    out.put_u16(chunk.skip_count);
                    out.put_u16(delta_count);
                    for &d in &chunk.deltas {
                        out.put_u16(d);
                    }
                }
            }
        }

        Ok(out.freeze())
    }

    /// Parse and validate wire bytes.
    ///
    /// Delta chunks must not advance past `width * height` pixels, and the
    /// payload must contain no trailing bytes.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut buf = payload;
        if buf.remaining() < FRAME_HEADER_LEN {
            return Err(KgbError::MalformedFrame("payload shorter than frame header"));
        }
        let kind = FrameKind::try_from(buf.get_u8())?;
        let width = buf.get_u16();
        let height = buf.get_u16();
        let pixel_count = width as usize * height as usize;

        let parsed = match kind {
            FrameKind::Keyframe => {
                if buf.remaining() != 2 * pixel_count {
                    return Err(KgbError::MalformedFrame(
                        "keyframe pixel data does not match width * height",
                    ));
                }
                let pixels = (0..pixel_count).map(|_| buf.get_u16()).collect();
                FramePayload::Keyframe(PackedFrame::new(width, height, pixels)?)
            }
            FrameKind::Delta => {
                if buf.remaining() < 2 {
                    return Err(KgbError::MalformedFrame("delta frame missing chunk count"));
                }
                let chunk_count = buf.get_u16() as usize;
                let mut chunks = Vec::with_capacity(chunk_count);
                let mut cursor = 0usize;

                for _ in 0..chunk_count {
                    if buf.remaining() < CHUNK_HEADER_LEN {
                        return Err(KgbError::MalformedFrame("truncated chunk header"));
                    }
                    let skip_count = buf.get_u16();
                    let delta_count = buf.get_u16() as usize;
                    if buf.remaining() < 2 * delta_count {
                        return Err(KgbError::MalformedFrame("truncated chunk deltas"));
                    }

                    cursor += skip_count as usize + delta_count;
                    if cursor > pixel_count {
                        return Err(KgbError::MalformedFrame("chunk overruns the pixel count"));
                    }

                    let deltas = (0..delta_count).map(|_| buf.get_u16()).collect();
                    chunks.push(Chunk { skip_count, deltas });
                }

                if buf.has_remaining() {
                    return Err(KgbError::MalformedFrame("trailing bytes after last chunk"));
                }

                FramePayload::Delta {
                    width,
                    height,
                    chunks,
                }
            }
        };

        Ok(parsed)
    }
}

fn put_pixels(out: &mut BytesMut, frame: &PackedFrame) {
    for &px in frame.pixels() {
        out.put_u16(px);
    }
}

/// Serialise a keyframe straight from a borrowed frame.
pub(crate) fn keyframe_bytes(frame: &PackedFrame) -> Bytes {
    let mut out = BytesMut::with_capacity(FRAME_HEADER_LEN + 2 * frame.len());
    out.put_u8(FrameKind::Keyframe as u8);
    out.put_u16(frame.width());
    out.put_u16(frame.height());
    put_pixels(&mut out, frame);
    out.freeze()
}
