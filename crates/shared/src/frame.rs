//! Rendered bitmaps handed from the controller to a render backend.

use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::{DrawTarget, OriginDimensions, Pixel, Size},
};

use crate::error::FrameError;

/// Luma at or above this value counts as a lit pixel on monochrome targets.
const LIT_THRESHOLD: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One bit per pixel, row-major, each row padded to a whole byte, MSB leftmost.
    Mono1,
    Gray8,
    Rgba8,
}

impl PixelFormat {
    pub fn row_stride(self, width: u32) -> usize {
        let width = width as usize;
        match self {
            PixelFormat::Mono1 => width.div_ceil(8),
            PixelFormat::Gray8 => width,
            PixelFormat::Rgba8 => width * 4,
        }
    }

    pub fn buffer_len(self, width: u32, height: u32) -> usize {
        self.row_stride(width) * height as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u8>,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyDimensions { width, height });
        }
        let expected = format.buffer_len(width, height);
        if pixels.len() != expected {
            return Err(FrameError::BufferLength {
                format,
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            pixels,
        })
    }

    /// All pixels dark. Zero-sized dimensions are clamped to one pixel.
    pub fn blank(width: u32, height: u32, format: PixelFormat) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut pixels = vec![0; format.buffer_len(width, height)];
        if format == PixelFormat::Rgba8 {
            for px in pixels.chunks_exact_mut(4) {
                px[3] = u8::MAX;
            }
        }
        Self {
            width,
            height,
            format,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn has_size(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    /// Monochrome view of the pixel at `(x, y)`; out-of-bounds reads are dark.
    pub fn is_lit(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let row = y as usize * self.format.row_stride(self.width);
        match self.format {
            PixelFormat::Mono1 => {
                let byte = self.pixels[row + x as usize / 8];
                byte & (0x80 >> (x % 8)) != 0
            }
            PixelFormat::Gray8 => self.pixels[row + x as usize] >= LIT_THRESHOLD,
            PixelFormat::Rgba8 => {
                let i = row + x as usize * 4;
                luma(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]) >= LIT_THRESHOLD
            }
        }
    }

    /// Out-of-bounds writes are ignored.
    pub fn set_lit(&mut self, x: u32, y: u32, lit: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let row = y as usize * self.format.row_stride(self.width);
        match self.format {
            PixelFormat::Mono1 => {
                let mask = 0x80 >> (x % 8);
                let byte = &mut self.pixels[row + x as usize / 8];
                if lit {
                    *byte |= mask;
                } else {
                    *byte &= !mask;
                }
            }
            PixelFormat::Gray8 => {
                self.pixels[row + x as usize] = if lit { u8::MAX } else { 0 };
            }
            PixelFormat::Rgba8 => {
                let i = row + x as usize * 4;
                let level = if lit { u8::MAX } else { 0 };
                self.pixels[i..i + 3].fill(level);
                self.pixels[i + 3] = u8::MAX;
            }
        }
    }

    pub fn fill(&mut self, lit: bool) {
        for y in 0..self.height {
            for x in 0..self.width {
                self.set_lit(x, y, lit);
            }
        }
    }

    /// Unmultiplied RGBA8, `width * height * 4` bytes, for texture upload.
    pub fn to_rgba(&self) -> Vec<u8> {
        match self.format {
            PixelFormat::Rgba8 => self.pixels.clone(),
            PixelFormat::Gray8 => self
                .pixels
                .iter()
                .flat_map(|&l| [l, l, l, u8::MAX])
                .collect(),
            PixelFormat::Mono1 => {
                let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
                for y in 0..self.height {
                    for x in 0..self.width {
                        let level = if self.is_lit(x, y) { u8::MAX } else { 0 };
                        out.extend_from_slice(&[level, level, level, u8::MAX]);
                    }
                }
                out
            }
        }
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    // ITU-R 601-2, same weights PIL uses for "L" conversion
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Frame {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) {
                self.set_lit(x, y, color.is_on());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/frame_tests.rs"]
mod tests;
