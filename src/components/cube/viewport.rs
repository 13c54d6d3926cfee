//! Sizing math for the render surface
//!
//! Tracks the host element's CSS size and the device pixel ratio, capped to
//! bound GPU-equivalent raster cost on high-density displays.

/// Upper bound on the device pixel ratio
pub const MAX_PIXEL_RATIO: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    width: f64,
    height: f64,
    pixel_ratio: f64,
}

impl Viewport {
    /// `device_ratio` is read once at construction and capped.
    pub fn new(width: f64, height: f64, device_ratio: f64) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            pixel_ratio: device_ratio.clamp(1.0, MAX_PIXEL_RATIO),
        }
    }

    pub fn aspect(&self) -> f64 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Output buffer width in device pixels, never zero.
    pub fn buffer_width(&self) -> u32 {
        ((self.width * self.pixel_ratio).round() as u32).max(1)
    }

    /// Output buffer height in device pixels, never zero.
    pub fn buffer_height(&self) -> u32 {
        ((self.height * self.pixel_ratio).round() as u32).max(1)
    }

    /// Adopt a new CSS size; returns whether anything changed, so callers
    /// can skip buffer reallocation. Safe to call at any frequency.
    pub fn resize(&mut self, width: f64, height: f64) -> bool {
        let (width, height) = (width.max(0.0), height.max(0.0));
        if width == self.width && height == self.height {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }
}
