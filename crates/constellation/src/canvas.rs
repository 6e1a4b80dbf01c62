//! The 2D drawing surface that the particle background is painted onto.
//!
//! Coordinates given to a [`Canvas`] are always "logical" pixels, the same units that particle
//! positions and the connection distance are measured in. A [`PixelCanvas`] then maps those onto
//! its own raster using a `scale`. Headless renders use a scale of 1, whereas terminals, having
//! such enormous pixels, use a larger one so that the constellation doesn't look cramped.

use crate::colour::{Colour, TRANSPARENT};

/// An x/y coordinate in logical pixels.
pub(crate) type Point = (f32, f32);

/// The logical dimensions of a drawing surface.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct SurfaceSize {
    /// Width in logical pixels
    pub width: f32,
    /// Height in logical pixels
    pub height: f32,
}

impl SurfaceSize {
    /// The surface covers the whole of its container, but is never shorter than the viewport.
    /// That way there aren't any bare patches when the container is temporarily shorter than the
    /// screen.
    #[must_use]
    pub fn covering(container_width: f32, container_height: f32, viewport_height: f32) -> Self {
        Self {
            width: container_width,
            height: container_height.max(viewport_height),
        }
    }

    /// Can anything actually be drawn?
    #[must_use]
    pub fn is_drawable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// The drawing operations that the particle background needs.
pub(crate) trait Canvas {
    /// The current logical size.
    fn size(&self) -> SurfaceSize;

    /// Change the logical size. Existing contents are discarded.
    fn resize(&mut self, size: SurfaceSize);

    /// Wipe the whole surface.
    fn clear(&mut self);

    /// Draw a filled circle.
    fn fill_circle(&mut self, centre: Point, radius: f32, colour: Colour, alpha: f32);

    /// Draw a straight line.
    fn stroke_line(&mut self, from: Point, to: Point, colour: Colour, alpha: f32, width: f32);
}

/// An RGBA framebuffer with "source-over" alpha blending.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PixelCanvas {
    /// Logical size
    size: SurfaceSize,
    /// How many logical pixels fit in one raster pixel
    scale: f32,
    /// Raster width
    columns: usize,
    /// Raster height
    rows: usize,
    /// Row-major raster
    pixels: Vec<Colour>,
}

#[expect(
    clippy::as_conversions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "We're rasterising floats onto a pixel grid"
)]
impl PixelCanvas {
    /// Create a canvas. There's no canvas at all when the scale is unusable.
    #[must_use]
    pub fn new(size: SurfaceSize, scale: f32) -> Option<Self> {
        if !scale.is_finite() || scale <= 0.0 {
            return None;
        }

        let mut canvas = Self {
            size: SurfaceSize::default(),
            scale,
            columns: 0,
            rows: 0,
            pixels: Vec::new(),
        };
        canvas.resize(size);
        Some(canvas)
    }

    /// Raster width in pixels.
    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }

    /// Raster height in pixels.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// The colour of a raster pixel.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> Option<Colour> {
        if x >= self.columns {
            return None;
        }
        self.pixels.get(y * self.columns + x).copied()
    }

    /// Convert a logical length to a raster length.
    fn to_raster(&self, logical: f32) -> f32 {
        logical / self.scale
    }

    /// Number of raster pixels needed to cover a logical length.
    fn raster_extent(&self, logical: f32) -> usize {
        if logical <= 0.0 || !logical.is_finite() {
            return 0;
        }
        self.to_raster(logical).ceil() as usize
    }

    /// Blend a colour onto a single raster pixel. Out of bounds pixels are silently ignored, it's
    /// normal for circles and lines to hang over the edges.
    fn blend(&mut self, x: i64, y: i64, colour: Colour, alpha: f32) {
        if x < 0 || y < 0 {
            return;
        }
        let (column, row) = (x as usize, y as usize);
        if column >= self.columns || row >= self.rows {
            return;
        }
        let Some(pixel) = self.pixels.get_mut(row * self.columns + column) else {
            return;
        };

        let source_alpha = (colour.3 * alpha).clamp(0.0, 1.0);
        if source_alpha <= 0.0 {
            return;
        }
        let destination_alpha = pixel.3 * (1.0 - source_alpha);
        let out_alpha = source_alpha + destination_alpha;
        let mix = |source: f32, destination: f32| {
            (source * source_alpha + destination * destination_alpha) / out_alpha
        };
        *pixel = (
            mix(colour.0, pixel.0),
            mix(colour.1, pixel.1),
            mix(colour.2, pixel.2),
            out_alpha,
        );
    }
}

#[expect(
    clippy::as_conversions,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "We're rasterising floats onto a pixel grid"
)]
impl Canvas for PixelCanvas {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
        self.columns = self.raster_extent(size.width);
        self.rows = self.raster_extent(size.height);
        self.pixels = vec![TRANSPARENT; self.columns * self.rows];
    }

    fn clear(&mut self) {
        self.pixels.fill(TRANSPARENT);
    }

    fn fill_circle(&mut self, centre: Point, radius: f32, colour: Colour, alpha: f32) {
        let centre_x = self.to_raster(centre.0);
        let centre_y = self.to_raster(centre.1);
        let raster_radius = self.to_raster(radius).max(0.0);
        let radius_squared = raster_radius * raster_radius;

        // Only visit the part of the bounding box that's actually on the raster, radiuses aren't
        // bounded so the box can be vastly bigger than the canvas.
        let last_column = i64::try_from(self.columns).unwrap_or(i64::MAX).saturating_sub(1);
        let last_row = i64::try_from(self.rows).unwrap_or(i64::MAX).saturating_sub(1);
        let left = ((centre_x - raster_radius).floor() as i64).max(0);
        let right = ((centre_x + raster_radius).ceil() as i64).min(last_column);
        let top = ((centre_y - raster_radius).floor() as i64).max(0);
        let bottom = ((centre_y + raster_radius).ceil() as i64).min(last_row);

        let mut is_any_pixel_covered = false;
        for y in top..=bottom {
            for x in left..=right {
                let delta_x = x as f32 + 0.5 - centre_x;
                let delta_y = y as f32 + 0.5 - centre_y;
                if delta_x * delta_x + delta_y * delta_y <= radius_squared {
                    self.blend(x, y, colour, alpha);
                    is_any_pixel_covered = true;
                }
            }
        }

        // Circles smaller than a raster pixel still get to be seen.
        if !is_any_pixel_covered {
            self.blend(centre_x.floor() as i64, centre_y.floor() as i64, colour, alpha);
        }
    }

    /// Lines are always a single raster pixel wide. Widths thinner than that reduce the alpha
    /// proportionally instead.
    fn stroke_line(&mut self, from: Point, to: Point, colour: Colour, alpha: f32, width: f32) {
        let coverage = width.clamp(0.0, 1.0);
        let (start_x, start_y) = (self.to_raster(from.0), self.to_raster(from.1));
        let (end_x, end_y) = (self.to_raster(to.0), self.to_raster(to.1));
        let delta_x = end_x - start_x;
        let delta_y = end_y - start_y;
        let steps = delta_x.abs().max(delta_y.abs()).ceil().max(1.0) as i64;

        let mut previous = None;
        for step in 0..=steps {
            let progress = step as f32 / steps as f32;
            let x = (start_x + delta_x * progress).floor() as i64;
            let y = (start_y + delta_y * progress).floor() as i64;
            if previous == Some((x, y)) {
                continue;
            }
            previous = Some((x, y));
            self.blend(x, y, colour, alpha * coverage);
        }
    }
}
