//! Frame sources for the recorder.
//!
//! [`GdiCapturer`] copies the primary display into a 24-bit top-down DIB
//! section with `BitBlt`. It is **Windows-only**; on other platforms the
//! type exists but construction fails at runtime. [`TestPattern`] generates
//! a moving bar and works everywhere.

use kgb_core::{CaptureSource, KgbError, PixelFormat, RawScreenFrame, Result};

/// GDI screen capturer for the primary display.
pub struct GdiCapturer {
    width: u32,
    height: u32,
}

// ── Windows implementation ───────────────────────────────────────

#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use std::ffi::c_void;
    use windows::Win32::Foundation::HANDLE;
    use windows::Win32::Graphics::Gdi::*;
    use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

    impl GdiCapturer {
        /// Size the capturer to the primary display's native resolution.
        pub fn new() -> Result<Self> {
            let width = unsafe { GetSystemMetrics(SM_CXSCREEN) };
            let height = unsafe { GetSystemMetrics(SM_CYSCREEN) };
            if width <= 0 || height <= 0 {
                return Err(KgbError::Platform(
                    "GetSystemMetrics returned no screen size".into(),
                ));
            }
            Ok(Self {
                width: width as u32,
                height: height as u32,
            })
        }

        unsafe fn capture_inner(&mut self) -> Result<RawScreenFrame> {
            let screen_dc = unsafe { GetDC(None) };
            if screen_dc.is_invalid() {
                return Err(KgbError::Platform("GetDC failed".into()));
            }
            let mem_dc = unsafe { CreateCompatibleDC(screen_dc) };

            let bmi = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: self.width as i32,
                    // Negative height = top-down DIB (origin at top-left).
                    biHeight: -(self.height as i32),
                    biPlanes: 1,
                    biBitCount: 24,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };

            let mut bits: *mut c_void = std::ptr::null_mut();
            let result = unsafe {
                CreateDIBSection(screen_dc, &bmi, DIB_RGB_COLORS, &mut bits, HANDLE::default(), 0)
            }
            .map_err(|e| KgbError::Platform(format!("CreateDIBSection failed: {e}")))
            .and_then(|bitmap| {
                let previous = unsafe { SelectObject(mem_dc, HGDIOBJ(bitmap.0)) };
                let blit = unsafe {
                    BitBlt(
                        mem_dc,
                        0,
                        0,
                        self.width as i32,
                        self.height as i32,
                        screen_dc,
                        0,
                        0,
                        SRCCOPY,
                    )
                }
                .map_err(|e| KgbError::Platform(format!("BitBlt failed: {e}")));

                // DIB rows are padded to 4 bytes.
                let stride = (self.width * 3 + 3) & !3;
                let frame = blit.map(|()| {
                    let len = stride as usize * self.height as usize;
                    let data = unsafe { std::slice::from_raw_parts(bits as *const u8, len) };
                    RawScreenFrame {
                        width: self.width,
                        height: self.height,
                        stride,
                        format: PixelFormat::Bgr8,
                        data: data.to_vec(),
                    }
                });

                unsafe {
                    SelectObject(mem_dc, previous);
                    let _ = DeleteObject(HGDIOBJ(bitmap.0));
                }
                frame
            });

            unsafe {
                let _ = DeleteDC(mem_dc);
                ReleaseDC(None, screen_dc);
            }
            result
        }
    }

    impl CaptureSource for GdiCapturer {
        fn capture(&mut self) -> Result<RawScreenFrame> {
            unsafe { self.capture_inner() }
        }
    }
}

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
impl GdiCapturer {
    /// GDI is only available on Windows.
    pub fn new() -> Result<Self> {
        Err(KgbError::Platform(
            "GDI screen capture is only available on Windows".into(),
        ))
    }
}

#[cfg(not(target_os = "windows"))]
impl CaptureSource for GdiCapturer {
    fn capture(&mut self) -> Result<RawScreenFrame> {
        Err(KgbError::Platform("Not supported on this platform".into()))
    }
}

impl GdiCapturer {
    /// Screen width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Screen height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }
}

// ── TestPattern ──────────────────────────────────────────────────

/// A gradient background with a white bar sliding one column per frame.
pub struct TestPattern {
    width: u32,
    height: u32,
    tick: u32,
}

impl TestPattern {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width: width as u32,
            height: height as u32,
            tick: 0,
        }
    }
}

impl CaptureSource for TestPattern {
    fn capture(&mut self) -> Result<RawScreenFrame> {
        let bar = if self.width == 0 { 0 } else { self.tick % self.width };
        let mut data = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                if x == bar {
                    data.extend_from_slice(&[0xFF, 0xFF, 0xFF]);
                } else {
                    let g = (y * 255 / self.height.max(1)) as u8;
                    let r = (x * 255 / self.width.max(1)) as u8;
                    data.extend_from_slice(&[0x40, g, r]);
                }
            }
        }
        self.tick = self.tick.wrapping_add(1);
        Ok(RawScreenFrame::tight(
            self.width,
            self.height,
            PixelFormat::Bgr8,
            data,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgb_core::pack_frame;

    #[test]
    fn test_pattern_moves_one_column_per_frame() {
        let mut src = TestPattern::new(8, 4);
        let a = pack_frame(&src.capture().unwrap()).unwrap();
        let b = pack_frame(&src.capture().unwrap()).unwrap();
        assert_eq!(a.dimensions(), (8, 4));

        let changed: Vec<usize> = a
            .pixels()
            .iter()
            .zip(b.pixels())
            .enumerate()
            .filter(|(_, (p, q))| p != q)
            .map(|(i, _)| i % 8)
            .collect();
        // Columns 0 and 1 change on every row.
        assert_eq!(changed.len(), 8);
        assert!(changed.iter().all(|&x| x == 0 || x == 1));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn gdi_capturer_is_unavailable() {
        assert!(matches!(GdiCapturer::new(), Err(KgbError::Platform(_))));
    }
}
