//! The reusable frame buffer and its [`Resolution`].

use std::fmt;

/// Number of bytes per pixel. Frames are always RGBA8 so they can be uploaded to the GPU as-is.
pub const BYTES_PER_PIXEL: usize = 4;

/// Resolution (`width x height`) of a frame or window.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    /// Creates a new [`Resolution`] of `width x height`.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the width of this [`Resolution`].
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of this [`Resolution`].
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn num_pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns `true` if either dimension is 0.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of bytes an RGBA8 frame of this resolution occupies.
    pub fn rgba8_len(&self) -> usize {
        self.num_pixels() as usize * BYTES_PER_PIXEL
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// An RGBA8 frame buffer.
///
/// A [`Frame`] is meant to be reused: a video source overwrites it with every frame it reads,
/// keeping the allocation around, and [`Frame::clear`]s it when there was nothing to read.
/// Consumers have to check [`Frame::is_empty`] before looking at the pixel data.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Frame {
    res: Resolution,
    data: Vec<u8>,
}

impl Frame {
    /// Creates an empty frame without allocating.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frame filled with the given RGBA8 color.
    pub fn filled(res: Resolution, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(res.rgba8_len());
        for _ in 0..res.num_pixels() {
            data.extend_from_slice(&rgba);
        }
        Self { res, data }
    }

    /// Creates a frame from tightly packed RGBA8 pixel data.
    ///
    /// # Panics
    ///
    /// Panics if `data` does not hold exactly `res.num_pixels()` RGBA8 pixels.
    pub fn from_rgba8(res: Resolution, data: &[u8]) -> Self {
        let mut frame = Self::new();
        frame.fill_rgba8(res, data);
        frame
    }

    /// Overwrites this frame with new RGBA8 pixel data, reusing the existing allocation.
    ///
    /// # Panics
    ///
    /// Panics if `data` does not hold exactly `res.num_pixels()` RGBA8 pixels.
    pub fn fill_rgba8(&mut self, res: Resolution, data: &[u8]) {
        assert_eq!(
            res.rgba8_len(),
            data.len(),
            "RGBA8 data of length {} does not match resolution {}",
            data.len(),
            res,
        );
        self.data.clear();
        self.data.extend_from_slice(data);
        self.res = res;
    }

    /// Empties the frame. The allocation is kept for the next [`Frame::fill_rgba8`].
    pub fn clear(&mut self) {
        self.data.clear();
        self.res = Resolution::default();
    }

    /// Returns `true` if the frame holds no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.res.is_empty() || self.data.is_empty()
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.res
    }

    /// Returns the raw RGBA8 pixel data, row by row without padding.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("res", &self.res)
            .field("len", &self.data.len())
            .finish()
    }
}
