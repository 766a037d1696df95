//! Shared frame types for the capture and playback pipelines.
//!
//! [`RawScreenFrame`] is what a capture source hands over (24/32-bit color,
//! possibly padded rows). [`PackedFrame`] is the 16-bit RGB565 buffer the
//! codec works on.

use crate::error::{KgbError, Result};

// ── PixelFormat ──────────────────────────────────────────────────

/// Pixel layout for raw captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 3 bytes per pixel: Blue, Green, Red (GDI 24-bit DIB).
    Bgr8,
    /// 3 bytes per pixel: Red, Green, Blue.
    Rgb8,
    /// 4 bytes per pixel: Blue, Green, Red, Alpha.
    Bgra8,
}

impl PixelFormat {
    /// Bytes consumed by a single pixel in this format.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgr8 | PixelFormat::Rgb8 => 3,
            PixelFormat::Bgra8 => 4,
        }
    }
}

// ── RawScreenFrame ───────────────────────────────────────────────

/// A raw, uncompressed screen capture obtained from the OS.
///
/// The `data` buffer holds `height` rows of `stride` bytes each.
/// `stride` may be larger than `width * bytes_per_pixel` because GDI pads
/// DIB rows to 4-byte boundaries.
#[derive(Debug, Clone)]
pub struct RawScreenFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Row pitch in **bytes** (may exceed `width * bpp`).
    pub stride: u32,
    /// Pixel layout.
    pub format: PixelFormat,
    /// Raw pixel data: `stride * height` bytes.
    pub data: Vec<u8>,
}

impl RawScreenFrame {
    /// Build a tightly packed frame (no row padding).
    pub fn tight(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width * format.bytes_per_pixel() as u32,
            format,
            data,
        }
    }

    /// Total byte size the raw bitmap occupies.
    pub fn byte_len(&self) -> usize {
        self.stride as usize * self.height as usize
    }

    /// Returns the visible pixel bytes of row `y` (padding excluded).
    ///
    /// # Panics
    ///
    /// Panics if `y` is out of bounds or `data` is shorter than
    /// [`byte_len`](Self::byte_len).
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride as usize;
        let end = start + self.width as usize * self.format.bytes_per_pixel();
        &self.data[start..end]
    }
}

// ── PackedFrame ──────────────────────────────────────────────────

/// A row-major buffer of RGB565 pixels.
///
/// `pixels.len() == width * height` always holds; the constructor rejects
/// anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedFrame {
    width: u16,
    height: u16,
    pixels: Vec<u16>,
}

impl PackedFrame {
    /// Wrap `pixels` as a `width × height` frame.
    pub fn new(width: u16, height: u16, pixels: Vec<u16>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(KgbError::MalformedFrame(
                "pixel count does not match width * height",
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A frame filled with a single packed color.
    pub fn filled(width: u16, height: u16, value: u16) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// `(width, height)` pair.
    pub fn dimensions(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    /// Mutable pixel access. The length cannot change through a slice, so
    /// the size invariant holds.
    pub fn pixels_mut(&mut self) -> &mut [u16] {
        &mut self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn into_pixels(self) -> Vec<u16> {
        self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_frame_rejects_wrong_length() {
        assert!(PackedFrame::new(2, 2, vec![0; 3]).is_err());
        assert!(PackedFrame::new(2, 2, vec![0; 4]).is_ok());
    }

    #[test]
    fn empty_dimensions_are_allowed() {
        let frame = PackedFrame::new(0, 5, Vec::new()).unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.dimensions(), (0, 5));
    }

    #[test]
    fn row_skips_padding() {
        // 1×2 frame in BGR8 with 4-byte stride (1 padding byte per row).
        let frame = RawScreenFrame {
            width: 1,
            height: 2,
            stride: 4,
            format: PixelFormat::Bgr8,
            data: vec![1, 2, 3, 0xEE, 4, 5, 6, 0xEE],
        };
        assert_eq!(frame.byte_len(), 8);
        assert_eq!(frame.row(0), &[1, 2, 3]);
        assert_eq!(frame.row(1), &[4, 5, 6]);
    }
}
