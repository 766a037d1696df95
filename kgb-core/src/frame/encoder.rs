//! Keyframe / delta-frame encoder.
//!
//! The free functions produce the two record kinds directly. The
//! [`FrameEncoder`] remembers the previous frame and picks the kind for
//! each new one, much like a change detector: the first frame, a resolution
//! change or the configured keyframe interval forces a keyframe, and a delta
//! that would not fit the wire format (or would be larger than a keyframe)
//! falls back to one as well.

use bytes::Bytes;
use tracing::debug;

use crate::error::{KgbError, Result};
use crate::frame::{Chunk, FRAME_HEADER_LEN, FrameKind, FramePayload, keyframe_bytes};
use crate::types::PackedFrame;

const RUN_MAX: usize = u16::MAX as usize;

/// Serialise a full snapshot. Always `5 + 2·width·height` bytes.
pub fn encode_keyframe(frame: &PackedFrame) -> Bytes {
    keyframe_bytes(frame)
}

/// Serialise the XOR difference between `prev` and `curr`.
///
/// Fails with [`KgbError::DimensionMismatch`] if the frames differ in size
/// and with [`KgbError::Unrepresentable`] if more than `u16::MAX` chunks
/// are needed.
pub fn encode_delta(prev: &PackedFrame, curr: &PackedFrame) -> Result<Bytes> {
    delta_payload(prev, curr)?.to_bytes()
}

/// Build the typed delta payload for `prev → curr`.
pub fn delta_payload(prev: &PackedFrame, curr: &PackedFrame) -> Result<FramePayload> {
    if prev.dimensions() != curr.dimensions() {
        return Err(KgbError::DimensionMismatch {
            expected: prev.dimensions(),
            actual: curr.dimensions(),
        });
    }
    Ok(FramePayload::Delta {
        width: curr.width(),
        height: curr.height(),
        chunks: diff_chunks(prev.pixels(), curr.pixels()),
    })
}

/// Single left-to-right scan producing skip/delta chunks.
///
/// A run of equal pixels becomes the skip, the run of differing pixels
/// right after it becomes the deltas. Unchanged pixels at the end of the
/// buffer produce no chunk. Runs that do not fit 16 bits are split: long
/// skips are carried by `{ skip_count: 65535, deltas: [] }` chunks, long
/// delta runs continue in a new chunk with `skip_count = 0`.
fn diff_chunks(prev: &[u16], curr: &[u16]) -> Vec<Chunk> {
    debug_assert_eq!(prev.len(), curr.len());
    let n = curr.len();
    let mut chunks = Vec::new();
    let mut i = 0;

    while i < n {
        let run_start = i;
        while i < n && prev[i] == curr[i] {
            i += 1;
        }
        if i == n {
            break;
        }

        let mut skip = i - run_start;
        while skip > RUN_MAX {
            chunks.push(Chunk {
                skip_count: u16::MAX,
                deltas: Vec::new(),
            });
            skip -= RUN_MAX;
        }

        let mut deltas = Vec::new();
        while i < n && prev[i] != curr[i] && deltas.len() < RUN_MAX {
            deltas.push(prev[i] ^ curr[i]);
            i += 1;
        }

        chunks.push(Chunk {
            skip_count: skip as u16,
            deltas,
        });
    }

    chunks
}

// ── EncodedFrame ─────────────────────────────────────────────────

/// A serialised frame record ready for the container.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub kind: FrameKind,
    pub payload: Bytes,
}

// ── EncoderStats ─────────────────────────────────────────────────

/// Running totals kept by [`FrameEncoder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderStats {
    pub frames: u64,
    pub keyframes: u64,
    pub delta_frames: u64,
    /// Payload bytes produced (length prefixes excluded).
    pub bytes: u64,
}

// ── FrameEncoder ─────────────────────────────────────────────────

/// Stateful encoder holding the previous frame.
pub struct FrameEncoder {
    previous: Option<PackedFrame>,
    /// Emit a keyframe every `keyframe_interval` frames; 0 = first only.
    keyframe_interval: u32,
    /// Position of the next frame relative to the last keyframe.
    since_keyframe: u32,
    stats: EncoderStats,
}

impl FrameEncoder {
    /// Create an encoder. `keyframe_interval == 0` emits a single keyframe.
    pub fn new(keyframe_interval: u32) -> Self {
        Self {
            previous: None,
            keyframe_interval,
            since_keyframe: 0,
            stats: EncoderStats::default(),
        }
    }

    /// Forget the previous frame, forcing the next one to be a keyframe.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn stats(&self) -> EncoderStats {
        self.stats
    }

    /// Encode `frame`, which then becomes the reference for the next call.
    pub fn encode(&mut self, frame: PackedFrame) -> Result<EncodedFrame> {
        let encoded = match self.delta_against_previous(&frame)? {
            Some(payload) => EncodedFrame {
                kind: FrameKind::Delta,
                payload,
            },
            None => EncodedFrame {
                kind: FrameKind::Keyframe,
                payload: encode_keyframe(&frame),
            },
        };

        match encoded.kind {
            FrameKind::Keyframe => {
                self.stats.keyframes += 1;
                self.since_keyframe = 1;
            }
            FrameKind::Delta => {
                self.stats.delta_frames += 1;
                self.since_keyframe += 1;
            }
        }
        self.stats.frames += 1;
        self.stats.bytes += encoded.payload.len() as u64;
        self.previous = Some(frame);

        Ok(encoded)
    }

    /// `Some(bytes)` if a delta frame should be emitted, `None` for a keyframe.
    fn delta_against_previous(&self, frame: &PackedFrame) -> Result<Option<Bytes>> {
        let prev = match &self.previous {
            Some(prev) if prev.dimensions() == frame.dimensions() => prev,
            // First frame or resolution change.
            _ => return Ok(None),
        };

        if self.keyframe_interval > 0 && self.since_keyframe >= self.keyframe_interval {
            return Ok(None);
        }

        let payload = delta_payload(prev, frame)?;
        let keyframe_len = FRAME_HEADER_LEN + 2 * frame.len();
        if payload.encoded_len() >= keyframe_len {
            debug!(
                delta = payload.encoded_len(),
                keyframe = keyframe_len,
                "delta not smaller than keyframe; emitting keyframe"
            );
            return Ok(None);
        }

        match payload.to_bytes() {
            Ok(bytes) => Ok(Some(bytes)),
            Err(KgbError::Unrepresentable(reason)) => {
                debug!("delta unrepresentable ({reason}); emitting keyframe");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const A: u16 = 0x1111;
    const B: u16 = 0x2222;
    const C: u16 = 0x4444;

    fn frame(pixels: &[u16]) -> PackedFrame {
        PackedFrame::new(pixels.len() as u16, 1, pixels.to_vec()).unwrap()
    }

    #[test]
    fn keyframe_layout() {
        let f = PackedFrame::new(2, 1, vec![0x1234, 0x5678]).unwrap();
        let bytes = encode_keyframe(&f);
        assert_eq!(&bytes[..], &[0, 0, 2, 0, 1, 0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn single_changed_pixel_gives_one_chunk() {
        let prev = frame(&[A, A, B, B, A]);
        let curr = frame(&[A, A, C, B, A]);

        let payload = delta_payload(&prev, &curr).unwrap();
        let FramePayload::Delta { chunks, .. } = &payload else {
            panic!("expected delta payload");
        };
        assert_eq!(
            chunks,
            &vec![Chunk {
                skip_count: 2,
                deltas: vec![B ^ C],
            }]
        );

        let bytes = encode_delta(&prev, &curr).unwrap();
        let xor = B ^ C;
        assert_eq!(
            &bytes[..],
            &[1, 0, 5, 0, 1, 0, 1, 0, 2, 0, 1, (xor >> 8) as u8, xor as u8]
        );
    }

    #[test]
    fn identical_frames_have_no_chunks() {
        let f = frame(&[A, B, C, A]);
        let bytes = encode_delta(&f, &f).unwrap();
        assert_eq!(&bytes[..], &[1, 0, 4, 0, 1, 0, 0]);
    }

    #[test]
    fn chunks_follow_runs() {
        let prev = frame(&[A, B, B, A, A, C]);
        let curr = frame(&[C, C, B, A, B, A]);
        let FramePayload::Delta { chunks, .. } = delta_payload(&prev, &curr).unwrap() else {
            panic!("expected delta payload");
        };
        assert_eq!(
            chunks,
            vec![
                Chunk {
                    skip_count: 0,
                    deltas: vec![A ^ C, B ^ C],
                },
                Chunk {
                    skip_count: 2,
                    deltas: vec![A ^ B, C ^ A],
                },
            ]
        );
    }

    #[test]
    fn long_skip_is_split_into_carriers() {
        let n = 2 * RUN_MAX + 10;
        let prev = vec![0u16; n + 1];
        let mut curr = prev.clone();
        curr[n] = 7;

        let chunks = diff_chunks(&prev, &curr);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].skip_count, u16::MAX);
        assert!(chunks[0].deltas.is_empty());
        assert_eq!(chunks[1].skip_count, u16::MAX);
        assert_eq!(chunks[2].skip_count, 10);
        assert_eq!(chunks[2].deltas, vec![7]);
    }

    #[test]
    fn long_delta_run_continues_in_new_chunk() {
        let n = RUN_MAX + 3;
        let prev = vec![0u16; n];
        let curr = vec![1u16; n];

        let chunks = diff_chunks(&prev, &curr);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].skip_count, 0);
        assert_eq!(chunks[0].deltas.len(), RUN_MAX);
        assert_eq!(chunks[1].skip_count, 0);
        assert_eq!(chunks[1].deltas.len(), 3);
    }

    #[test]
    fn trailing_long_skip_emits_nothing() {
        let n = RUN_MAX + 100;
        let prev = vec![0u16; n];
        let mut curr = prev.clone();
        curr[0] = 1;
        let chunks = diff_chunks(&prev, &curr);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn mismatched_dimensions_fail() {
        let prev = PackedFrame::filled(2, 2, 0);
        let curr = PackedFrame::filled(4, 1, 0);
        assert!(matches!(
            encode_delta(&prev, &curr),
            Err(KgbError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn too_many_chunks_is_unrepresentable() {
        // Alternating changes need one chunk per changed pixel.
        let n = 2 * (RUN_MAX + 1);
        let prev = PackedFrame::filled((n / 4) as u16, 4, 0);
        let mut curr = prev.clone();
        for (i, px) in curr.pixels_mut().iter_mut().enumerate() {
            if i % 2 == 1 {
                *px = 1;
            }
        }
        assert!(matches!(
            encode_delta(&prev, &curr),
            Err(KgbError::Unrepresentable(_))
        ));
    }

    #[test]
    fn stateful_encoder_picks_kinds() {
        let mut enc = FrameEncoder::new(0);
        let base = PackedFrame::filled(8, 8, A);

        assert_eq!(enc.encode(base.clone()).unwrap().kind, FrameKind::Keyframe);

        let mut changed = base.clone();
        changed.pixels_mut()[3] = B;
        assert_eq!(enc.encode(changed).unwrap().kind, FrameKind::Delta);

        // Resolution change forces a keyframe.
        let other = PackedFrame::filled(4, 4, A);
        assert_eq!(enc.encode(other).unwrap().kind, FrameKind::Keyframe);

        let stats = enc.stats();
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.keyframes, 2);
        assert_eq!(stats.delta_frames, 1);
    }

    #[test]
    fn keyframe_interval_is_honoured() {
        let mut enc = FrameEncoder::new(3);
        let f = PackedFrame::filled(8, 8, A);
        let kinds: Vec<FrameKind> = (0..7)
            .map(|_| enc.encode(f.clone()).unwrap().kind)
            .collect();
        use FrameKind::{Delta as D, Keyframe as K};
        assert_eq!(kinds, vec![K, D, D, K, D, D, K]);
    }

    #[test]
    fn large_delta_falls_back_to_keyframe() {
        let mut enc = FrameEncoder::new(0);
        enc.encode(PackedFrame::filled(4, 4, A)).unwrap();
        // Every pixel changed: delta carries a chunk header on top of the
        // pixels, so it is larger than a keyframe.
        let out = enc.encode(PackedFrame::filled(4, 4, B)).unwrap();
        assert_eq!(out.kind, FrameKind::Keyframe);
        assert_eq!(out.payload.len(), 5 + 2 * 16);
    }

    #[test]
    fn reset_forces_keyframe() {
        let mut enc = FrameEncoder::new(0);
        let f = PackedFrame::filled(8, 8, A);
        enc.encode(f.clone()).unwrap();
        enc.reset();
        assert_eq!(enc.encode(f).unwrap().kind, FrameKind::Keyframe);
    }
}
