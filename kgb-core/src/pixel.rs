//! RGB888 ⇄ RGB565 pixel conversion.
//!
//! Packing keeps the top 5 bits of red, 6 of green and 5 of blue. Expanding
//! shifts them back and zero-fills the low bits, so a round trip drops
//! exactly the low 3/2/3 bits of each channel. There is no dithering.

use crate::error::{KgbError, Result};
use crate::types::{PackedFrame, PixelFormat, RawScreenFrame};

/// A 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb24 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb24 {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Pack a 24-bit color into RGB565.
#[inline]
pub const fn to_packed(c: Rgb24) -> u16 {
    ((c.r as u16 >> 3) << 11) | ((c.g as u16 >> 2) << 5) | (c.b as u16 >> 3)
}

/// Expand an RGB565 value back to 24-bit color.
#[inline]
pub const fn to_expanded(p: u16) -> Rgb24 {
    Rgb24 {
        r: (((p >> 11) & 0x1F) << 3) as u8,
        g: (((p >> 5) & 0x3F) << 2) as u8,
        b: ((p & 0x1F) << 3) as u8,
    }
}

/// Convert a captured frame into a packed frame.
///
/// Honours the pixel layout and skips row padding.
pub fn pack_frame(raw: &RawScreenFrame) -> Result<PackedFrame> {
    let width = u16::try_from(raw.width)
        .map_err(|_| KgbError::Unrepresentable(format!("width {} exceeds 16 bits", raw.width)))?;
    let height = u16::try_from(raw.height).map_err(|_| {
        KgbError::Unrepresentable(format!("height {} exceeds 16 bits", raw.height))
    })?;

    let bpp = raw.format.bytes_per_pixel();
    if (raw.stride as usize) < raw.width as usize * bpp {
        return Err(KgbError::MalformedFrame("stride shorter than a pixel row"));
    }
    if raw.data.len() < raw.byte_len() {
        return Err(KgbError::MalformedFrame("raw buffer shorter than stride * height"));
    }

    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for y in 0..raw.height {
        for px in raw.row(y).chunks_exact(bpp) {
            let c = match raw.format {
                PixelFormat::Bgr8 | PixelFormat::Bgra8 => Rgb24::new(px[2], px[1], px[0]),
                PixelFormat::Rgb8 => Rgb24::new(px[0], px[1], px[2]),
            };
            pixels.push(to_packed(c));
        }
    }

    PackedFrame::new(width, height, pixels)
}

/// Expand a packed frame into a tightly packed BGR24 buffer (top-down DIB
/// byte order), reusing `dst`'s allocation.
pub fn expand_into_bgr24(frame: &PackedFrame, dst: &mut Vec<u8>) {
    dst.clear();
    dst.reserve(frame.len() * 3);
    for &p in frame.pixels() {
        let c = to_expanded(p);
        dst.extend_from_slice(&[c.b, c.g, c.r]);
    }
}
