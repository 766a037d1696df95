//! Frame decoder.
//!
//! Consumes the same chunked representation the encoder produces. Every
//! payload is parsed and validated in full before the reconstruction is
//! modified, so a bad record leaves the last good frame untouched.

use tracing::trace;

use crate::error::{KgbError, Result};
use crate::frame::{Chunk, FrameKind, FramePayload};
use crate::types::PackedFrame;

/// Decode a keyframe payload into a fresh frame.
pub fn apply_keyframe(payload: &[u8]) -> Result<PackedFrame> {
    match FramePayload::parse(payload)? {
        FramePayload::Keyframe(frame) => Ok(frame),
        FramePayload::Delta { .. } => Err(KgbError::MalformedFrame("expected a keyframe")),
    }
}

/// Decode a delta payload against `prev`, returning the new frame.
pub fn apply_delta(payload: &[u8], prev: &PackedFrame) -> Result<PackedFrame> {
    let mut next = prev.clone();
    match FramePayload::parse(payload)? {
        FramePayload::Delta {
            width,
            height,
            chunks,
        } => {
            check_dimensions(prev, (width, height))?;
            apply_chunks(&mut next, &chunks);
            Ok(next)
        }
        FramePayload::Keyframe(_) => Err(KgbError::MalformedFrame("expected a delta frame")),
    }
}

fn check_dimensions(reference: &PackedFrame, declared: (u16, u16)) -> Result<()> {
    if reference.dimensions() != declared {
        return Err(KgbError::DimensionMismatch {
            expected: reference.dimensions(),
            actual: declared,
        });
    }
    Ok(())
}

/// Walk the chunk list: skip, then XOR.
///
/// Bounds were checked by [`FramePayload::parse`] against the declared
/// dimensions, which the caller matched against `frame`.
fn apply_chunks(frame: &mut PackedFrame, chunks: &[Chunk]) {
    let pixels = frame.pixels_mut();
    let mut cursor = 0usize;
    for chunk in chunks {
        cursor += chunk.skip_count as usize;
        for (px, d) in pixels[cursor..cursor + chunk.deltas.len()]
            .iter_mut()
            .zip(&chunk.deltas)
        {
            *px ^= d;
        }
        cursor += chunk.deltas.len();
    }
}

// ── FrameDecoder ─────────────────────────────────────────────────

/// Stateful decoder owning the current reconstruction.
///
/// Keyframes replace the buffer wholesale; delta frames patch it in place.
#[derive(Default)]
pub struct FrameDecoder {
    current: Option<PackedFrame>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Apply one frame record and return the updated reconstruction.
    ///
    /// On error the previous reconstruction is kept as-is.
    pub fn apply(&mut self, payload: &[u8]) -> Result<&PackedFrame> {
        let frame: &PackedFrame = match FramePayload::parse(payload)? {
            FramePayload::Keyframe(frame) => {
                trace!(dims = ?frame.dimensions(), "keyframe");
                self.current.insert(frame)
            }
            FramePayload::Delta {
                width,
                height,
                chunks,
            } => {
                let current = self.current.as_mut().ok_or(KgbError::MissingReference)?;
                check_dimensions(current, (width, height))?;
                trace!(chunks = chunks.len(), "delta frame");
                apply_chunks(current, &chunks);
                current
            }
        };
        Ok(frame)
    }

    /// Current reconstruction, if a keyframe has been seen.
    pub fn current(&self) -> Option<&PackedFrame> {
        self.current.as_ref()
    }

    /// Whether the next record must be a keyframe.
    pub fn needs_keyframe(&self) -> bool {
        self.current.is_none()
    }

    /// Drop the reconstruction.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Kind of a record without decoding it.
    pub fn peek_kind(payload: &[u8]) -> Result<FrameKind> {
        FrameKind::of(payload)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encoder::{encode_delta, encode_keyframe};

    fn ramp(w: u16, h: u16) -> PackedFrame {
        let pixels = (0..w as u32 * h as u32).map(|i| (i * 37) as u16).collect();
        PackedFrame::new(w, h, pixels).unwrap()
    }

    #[test]
    fn keyframe_roundtrip() {
        let f = ramp(16, 9);
        assert_eq!(apply_keyframe(&encode_keyframe(&f)).unwrap(), f);
    }

    #[test]
    fn delta_roundtrip() {
        let prev = ramp(16, 9);
        let mut curr = prev.clone();
        for i in [0usize, 1, 2, 50, 51, 143] {
            curr.pixels_mut()[i] = 0xBEEF;
        }
        let bytes = encode_delta(&prev, &curr).unwrap();
        assert_eq!(apply_delta(&bytes, &prev).unwrap(), curr);
    }

    #[test]
    fn empty_delta_returns_previous() {
        let prev = ramp(8, 8);
        let bytes = encode_delta(&prev, &prev).unwrap();
        assert_eq!(apply_delta(&bytes, &prev).unwrap(), prev);
    }

    #[test]
    fn carrier_chunks_are_accepted() {
        // 1×70000 is too wide for u16, so use 280×250 = 70_000 pixels.
        let prev = PackedFrame::filled(280, 250, 0);
        let mut curr = prev.clone();
        curr.pixels_mut()[69_999] = 0x0F0F;
        let bytes = encode_delta(&prev, &curr).unwrap();
        assert_eq!(apply_delta(&bytes, &prev).unwrap(), curr);
    }

    #[test]
    fn delta_dimension_mismatch_fails() {
        let prev = PackedFrame::filled(4, 4, 0);
        let other = PackedFrame::filled(2, 8, 0);
        let bytes = encode_delta(&other, &other).unwrap();
        assert!(matches!(
            apply_delta(&bytes, &prev),
            Err(KgbError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn wrong_kind_fails() {
        let f = ramp(2, 2);
        assert!(apply_keyframe(&encode_delta(&f, &f).unwrap()).is_err());
        assert!(apply_delta(&encode_keyframe(&f), &f).is_err());
    }

    #[test]
    fn decoder_requires_keyframe_first() {
        let f = ramp(4, 4);
        let mut dec = FrameDecoder::new();
        assert!(dec.needs_keyframe());
        let delta = encode_delta(&f, &f).unwrap();
        assert!(matches!(dec.apply(&delta), Err(KgbError::MissingReference)));
    }

    #[test]
    fn decoder_keeps_state_on_error() {
        let f = ramp(4, 4);
        let mut dec = FrameDecoder::new();
        dec.apply(&encode_keyframe(&f)).unwrap();

        // Overrunning chunk: skip 15 then 2 deltas on a 16-pixel frame.
        let bad = [1, 0, 4, 0, 4, 0, 1, 0, 15, 0, 2, 0, 1, 0, 1];
        assert!(dec.apply(&bad).is_err());
        assert_eq!(dec.current(), Some(&f));

        // Mismatched dimensions.
        let small = PackedFrame::filled(2, 2, 0);
        assert!(dec.apply(&encode_delta(&small, &small).unwrap()).is_err());
        assert_eq!(dec.current(), Some(&f));
    }

    #[test]
    fn decoder_follows_a_stream() {
        let f0 = ramp(8, 4);
        let mut f1 = f0.clone();
        f1.pixels_mut()[5] ^= 0x00FF;
        let mut f2 = f1.clone();
        f2.pixels_mut()[31] = 0;

        let mut dec = FrameDecoder::new();
        assert_eq!(dec.apply(&encode_keyframe(&f0)).unwrap(), &f0);
        assert_eq!(dec.apply(&encode_delta(&f0, &f1).unwrap()).unwrap(), &f1);
        assert_eq!(dec.apply(&encode_delta(&f1, &f2).unwrap()).unwrap(), &f2);

        // A keyframe mid-stream replaces the state.
        let g = PackedFrame::filled(3, 3, 0xAAAA);
        assert_eq!(dec.apply(&encode_keyframe(&g)).unwrap(), &g);
        assert_eq!(
            FrameDecoder::peek_kind(&encode_keyframe(&g)).unwrap(),
            FrameKind::Keyframe
        );
    }
}
