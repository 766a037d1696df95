//! Display sinks: blit decoded frames into the window.
//!
//! [`GdiDisplay`] uses GDI `StretchDIBits` with a 24-bit top-down DIB and
//! stretches the frame to the client area. [`HeadlessSink`] discards the
//! pixels and only counts frames, for `--headless` runs and tests.

use kgb_core::{DisplaySink, KgbError, Result};

/// Bytes per DIB row for a 24-bit image; GDI pads rows to 4 bytes.
pub fn dib_stride(width: u32) -> usize {
    ((width as usize * 3) + 3) & !3
}

/// Copy tightly packed BGR24 rows into `out` using the padded DIB stride.
pub fn pad_rows(bgr: &[u8], width: u32, height: u32, out: &mut Vec<u8>) {
    let row = width as usize * 3;
    let stride = dib_stride(width);
    out.clear();
    out.resize(stride * height as usize, 0);
    for (src, dst) in bgr.chunks_exact(row.max(1)).zip(out.chunks_exact_mut(stride.max(1))) {
        dst[..row].copy_from_slice(src);
    }
}

fn check_len(bgr: &[u8], width: u32, height: u32) -> Result<()> {
    let expected = width as usize * height as usize * 3;
    if bgr.len() < expected {
        return Err(KgbError::Platform(format!(
            "frame buffer too small: {} < {expected}",
            bgr.len()
        )));
    }
    Ok(())
}

// ── Windows implementation ───────────────────────────────────────

#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use windows::Win32::Foundation::*;
    use windows::Win32::Graphics::Gdi::*;

    /// Renders BGR24 frames into an HWND using GDI.
    pub struct GdiDisplay {
        hwnd: HWND,
        width: u32,
        height: u32,
        padded: Vec<u8>,
    }

    impl GdiDisplay {
        /// Create a display targeting the given window.
        pub fn new(hwnd: HWND, width: u32, height: u32) -> Self {
            Self {
                hwnd,
                width,
                height,
                padded: Vec::new(),
            }
        }

        /// Update the target size (call after WM_SIZE).
        pub fn resize(&mut self, width: u32, height: u32) {
            self.width = width;
            self.height = height;
        }
    }

    impl DisplaySink for GdiDisplay {
        fn present(&mut self, bgr: &[u8], frame_width: u32, frame_height: u32) -> Result<()> {
            if frame_width == 0 || frame_height == 0 {
                return Ok(());
            }
            check_len(bgr, frame_width, frame_height)?;

            let bits: &[u8] = if dib_stride(frame_width) == frame_width as usize * 3 {
                bgr
            } else {
                pad_rows(bgr, frame_width, frame_height, &mut self.padded);
                &self.padded
            };

            unsafe {
                let hdc = GetDC(self.hwnd);
                if hdc.is_invalid() {
                    return Err(KgbError::Platform("GetDC failed".into()));
                }

                let bmi = BITMAPINFO {
                    bmiHeader: BITMAPINFOHEADER {
                        biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                        biWidth: frame_width as i32,
                        // Negative height = top-down DIB (origin at top-left).
                        biHeight: -(frame_height as i32),
                        biPlanes: 1,
                        biBitCount: 24,
                        biCompression: BI_RGB.0,
                        ..Default::default()
                    },
                    bmiColors: [RGBQUAD::default(); 1],
                };

                StretchDIBits(
                    hdc,
                    0,
                    0,
                    self.width as i32,
                    self.height as i32,
                    0,
                    0,
                    frame_width as i32,
                    frame_height as i32,
                    Some(bits.as_ptr() as *const _),
                    &bmi,
                    DIB_RGB_COLORS,
                    SRCCOPY,
                );

                ReleaseDC(self.hwnd, hdc);
            }

            Ok(())
        }
    }
}

#[cfg(target_os = "windows")]
pub use platform::*;

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
pub mod stub {
    use super::*;

    pub struct GdiDisplay;

    impl GdiDisplay {
        pub fn new(_hwnd: (), _w: u32, _h: u32) -> Self {
            Self
        }

        pub fn resize(&mut self, _w: u32, _h: u32) {}
    }

    impl DisplaySink for GdiDisplay {
        fn present(&mut self, _bgr: &[u8], _w: u32, _h: u32) -> Result<()> {
            Err(KgbError::Platform(
                "Display rendering is only supported on Windows".into(),
            ))
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub use stub::*;

// ── Headless ─────────────────────────────────────────────────────

/// Accepts frames without showing them.
#[derive(Debug, Default)]
pub struct HeadlessSink {
    /// Frames presented so far.
    pub frames: u64,
    /// Size of the most recent frame.
    pub last_size: Option<(u32, u32)>,
}

impl DisplaySink for HeadlessSink {
    fn present(&mut self, bgr: &[u8], width: u32, height: u32) -> Result<()> {
        check_len(bgr, width, height)?;
        self.frames += 1;
        self.last_size = Some((width, height));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_is_dword_aligned() {
        assert_eq!(dib_stride(1), 4);
        assert_eq!(dib_stride(4), 12);
        assert_eq!(dib_stride(5), 16);
    }

    #[test]
    fn pad_rows_keeps_pixels_in_place() {
        // 1x2 image: one BGR pixel per row, one padding byte after each.
        let bgr = [1, 2, 3, 4, 5, 6];
        let mut out = Vec::new();
        pad_rows(&bgr, 1, 2, &mut out);
        assert_eq!(out, vec![1, 2, 3, 0, 4, 5, 6, 0]);
    }

    #[test]
    fn headless_counts_frames() {
        let mut sink = HeadlessSink::default();
        sink.present(&[0; 12], 2, 2).unwrap();
        sink.present(&[0; 12], 2, 2).unwrap();
        assert_eq!(sink.frames, 2);
        assert_eq!(sink.last_size, Some((2, 2)));
    }

    #[test]
    fn headless_rejects_short_buffer() {
        let mut sink = HeadlessSink::default();
        assert!(sink.present(&[0; 5], 2, 1).is_err());
    }
}
