//! Raster surface.
//!
//! An owned RGB framebuffer implementing the embedded-graphics
//! [`DrawTarget`] so the painter can use its text and primitive drawing.
//! Allocation is bounded: degenerate and over-budget sizes fail with a
//! [`RasterError`] the render-mode controller turns into an element-tree
//! fallback, never a crash.

pub mod paint;

pub use paint::paint_tree;

use embedded_graphics::Pixel;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::draw_target::DrawTarget;
use thiserror::Error;

use crate::types::Rgba;

// =============================================================================
// Errors
// =============================================================================

/// Why a raster surface could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RasterError {
    #[error("raster surface has degenerate size {width}x{height}")]
    DegenerateSize { width: u32, height: u32 },
    #[error("raster surface {width}x{height} exceeds the {budget}-pixel budget")]
    SurfaceTooLarge { width: u32, height: u32, budget: u64 },
}

/// Upper bound on surface area, 4096 x 4096.
pub const MAX_SURFACE_PIXELS: u64 = 4096 * 4096;

// =============================================================================
// Pixmap
// =============================================================================

/// Owned RGB888 framebuffer sized to content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    /// Row-major RGB bytes, 3 per pixel.
    data: Vec<u8>,
}

impl Pixmap {
    /// Allocate a surface, enforcing the size bounds.
    pub fn new(width: u32, height: u32) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::DegenerateSize { width, height });
        }
        let pixels = width as u64 * height as u64;
        if pixels > MAX_SURFACE_PIXELS {
            return Err(RasterError::SurfaceTooLarge {
                width,
                height,
                budget: MAX_SURFACE_PIXELS,
            });
        }
        Ok(Self {
            width,
            height,
            data: vec![0; (pixels * 3) as usize],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGB bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Fill the whole surface with one color.
    pub fn fill(&mut self, color: Rgba) {
        for px in self.data.chunks_exact_mut(3) {
            px[0] = color.r;
            px[1] = color.g;
            px[2] = color.b;
        }
    }

    /// Read one pixel; out-of-bounds reads are black.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        if x >= self.width || y >= self.height {
            return Rgba::BLACK;
        }
        let i = ((y * self.width + x) * 3) as usize;
        Rgba::rgb(self.data[i], self.data[i + 1], self.data[i + 2])
    }

    #[inline]
    fn put(&mut self, x: i32, y: i32, color: Rgb888) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        let i = ((y as u32 * self.width + x as u32) * 3) as usize;
        self.data[i] = color.r();
        self.data[i + 1] = color.g();
        self.data[i + 2] = color.b();
    }
}

impl OriginDimensions for Pixmap {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Pixmap {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.put(point.x, point.y, color);
        }
        Ok(())
    }
}

/// Flatten a possibly translucent color against the page background; the
/// surface stores opaque pixels only.
pub fn flatten(color: Rgba, background: Rgba) -> Rgb888 {
    let c = if color.is_opaque() {
        color
    } else {
        Rgba::blend(color, background)
    };
    Rgb888::new(c.r, c.g, c.b)
}

// =============================================================================
// Tests
// =============================================================================
