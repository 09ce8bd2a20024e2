//! Image groups and corner-handle resizing.

use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Minimum side length of a resized image, in canvas units.
pub const IMAGE_MIN_SIZE: f64 = 50.0;
/// Size assumed for an image the host has not measured yet.
pub const DEFAULT_IMAGE_SIZE: Size = Size::new(200.0, 100.0);
/// Largest size a freshly inserted image is shown at.
pub const MAX_NATURAL_SIZE: Size = Size::new(800.0, 600.0);

/// Resize handle positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageCorner {
    Nw,
    Ne,
    Sw,
    Se,
}

impl ImageCorner {
    pub const ALL: [ImageCorner; 4] = [ImageCorner::Nw, ImageCorner::Ne, ImageCorner::Sw, ImageCorner::Se];

    /// Direction in which a positive pointer delta grows the image.
    fn signs(self) -> (f64, f64) {
        match self {
            ImageCorner::Nw => (-1.0, -1.0),
            ImageCorner::Ne => (1.0, -1.0),
            ImageCorner::Sw => (-1.0, 1.0),
            ImageCorner::Se => (1.0, 1.0),
        }
    }

    /// The handle's point on a rectangle.
    pub fn point(self, rect: Rect) -> Point {
        match self {
            ImageCorner::Nw => Point::new(rect.x0, rect.y0),
            ImageCorner::Ne => Point::new(rect.x1, rect.y0),
            ImageCorner::Sw => Point::new(rect.x0, rect.y1),
            ImageCorner::Se => Point::new(rect.x1, rect.y1),
        }
    }
}

/// Result of a resize step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageResize {
    pub size: Size,
    /// Shift of the top-left corner so the opposite corner stays put.
    pub offset: Vec2,
}

/// Uniformly scale `start` by dragging `corner` by `delta` canvas units.
///
/// The factor is the larger of the two axis ratios, clamped so neither side
/// drops below `min_side`.
pub fn resize(start: Size, corner: ImageCorner, delta: Vec2, min_side: f64) -> ImageResize {
    if start.width <= 0.0 || start.height <= 0.0 {
        return ImageResize { size: start, offset: Vec2::ZERO };
    }
    let (sx, sy) = corner.signs();
    let factor = ((start.width + delta.x * sx) / start.width)
        .max((start.height + delta.y * sy) / start.height)
        .max(min_side / start.width)
        .max(min_side / start.height);
    let size = Size::new(start.width * factor, start.height * factor);
    let offset = Vec2::new(
        if sx < 0.0 { start.width - size.width } else { 0.0 },
        if sy < 0.0 { start.height - size.height } else { 0.0 },
    );
    ImageResize { size, offset }
}

/// Scale a natural image size down to fit [`MAX_NATURAL_SIZE`], keeping its
/// aspect ratio. Smaller images keep their size.
pub fn fit_natural_size(natural: Size) -> Size {
    if natural.width <= 0.0 || natural.height <= 0.0 {
        return DEFAULT_IMAGE_SIZE;
    }
    let ratio = (MAX_NATURAL_SIZE.width / natural.width)
        .min(MAX_NATURAL_SIZE.height / natural.height)
        .min(1.0);
    Size::new(natural.width * ratio, natural.height * ratio)
}

/// Content of an image group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageContent {
    pub url: String,
    /// Displayed size; `None` until known.
    pub size: Option<Size>,
}

impl ImageContent {
    pub fn new(url: impl Into<String>, size: Option<Size>) -> Self {
        Self { url: url.into(), size }
    }

    /// Displayed size, falling back to the placeholder size.
    pub fn display_size(&self) -> Size {
        self.size.unwrap_or(DEFAULT_IMAGE_SIZE)
    }

    /// Replace the source. The size is reset until the new image loads.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
        self.size = None;
    }

    /// Record the loaded image's natural size, if no size is set yet.
    pub fn set_natural_size(&mut self, natural: Size) {
        if self.size.is_none() {
            self.size = Some(fit_natural_size(natural));
        }
    }
}
