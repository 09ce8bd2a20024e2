//! Movable groups placed on the board: math stacks, text blocks and images.

mod image;
mod math;
mod text;

pub use image::{
    DEFAULT_IMAGE_SIZE, IMAGE_MIN_SIZE, ImageContent, ImageCorner, ImageResize, MAX_NATURAL_SIZE,
    fit_natural_size, resize,
};
pub use math::{DEFAULT_FIELD_HEIGHT, MathField, MathStack, PLACEHOLDER_LATEX};
pub use text::TextBlock;

use crate::persistence::FormatVersion;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for groups.
pub type GroupId = Uuid;

/// Width of the drag-handle strip on the left of each math field.
pub const FIELD_HANDLE_WIDTH: f64 = 16.0;

/// Group type tag, as written in document records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Math,
    Text,
    Image,
}

impl GroupKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupKind::Math => "math",
            GroupKind::Text => "text",
            GroupKind::Image => "image",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "math" => Some(GroupKind::Math),
            "text" => Some(GroupKind::Text),
            "image" => Some(GroupKind::Image),
            _ => None,
        }
    }
}

/// Type-specific content of a group.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupContent {
    Math(MathStack),
    Text(TextBlock),
    Image(ImageContent),
}

impl GroupContent {
    /// Fresh content for a new group: one empty editable field for math and
    /// text, an unset source for images.
    pub fn empty(kind: GroupKind, version: FormatVersion) -> Self {
        match kind {
            GroupKind::Math => GroupContent::Math(MathStack::new()),
            GroupKind::Text => GroupContent::Text(TextBlock::new(version)),
            GroupKind::Image => GroupContent::Image(ImageContent::default()),
        }
    }

    pub fn kind(&self) -> GroupKind {
        match self {
            GroupContent::Math(_) => GroupKind::Math,
            GroupContent::Text(_) => GroupKind::Text,
            GroupContent::Image(_) => GroupKind::Image,
        }
    }

    fn estimated_size(&self) -> Size {
        match self {
            GroupContent::Math(stack) => {
                let inner = stack.estimated_size();
                Size::new(inner.width + FIELD_HANDLE_WIDTH, inner.height)
            }
            GroupContent::Text(block) => block.estimated_size(),
            GroupContent::Image(image) => image.display_size(),
        }
    }
}

/// A movable unit on the board.
///
/// Position, size and registry identity are shared by every variant; only
/// the content differs.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub(crate) id: GroupId,
    /// Top-left corner in canvas units.
    pub position: Point,
    pub content: GroupContent,
    /// Rendered size reported by the host.
    measured: Option<Size>,
}

impl Group {
    pub fn new(position: Point, content: GroupContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            content,
            measured: None,
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn kind(&self) -> GroupKind {
        self.content.kind()
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }

    /// Record the size the host rendered this group at.
    pub fn set_measured_size(&mut self, size: Size) {
        self.measured = Some(size);
    }

    /// Current size: image size, else measured, else an estimate.
    pub fn size(&self) -> Size {
        match &self.content {
            GroupContent::Image(image) => image.display_size(),
            content => self.measured.unwrap_or_else(|| content.estimated_size()),
        }
    }

    /// Bounding box in canvas coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size())
    }

    /// Check if a canvas point lies inside the group.
    pub fn hit_test(&self, point: Point) -> bool {
        let b = self.bounds();
        point.x >= b.x0 && point.x <= b.x1 && point.y >= b.y0 && point.y <= b.y1
    }

    /// Index of the math field whose drag handle covers `point`.
    pub fn field_handle_at(&self, point: Point) -> Option<usize> {
        let GroupContent::Math(stack) = &self.content else {
            return None;
        };
        let local = point - self.position;
        if local.x < 0.0 || local.x > FIELD_HANDLE_WIDTH {
            return None;
        }
        stack.field_at_offset(local.y)
    }

    /// Index of the math field body covering `point`.
    pub fn field_at(&self, point: Point) -> Option<usize> {
        let GroupContent::Math(stack) = &self.content else {
            return None;
        };
        let local = point - self.position;
        if local.x <= FIELD_HANDLE_WIDTH || local.x > self.size().width {
            return None;
        }
        stack.field_at_offset(local.y)
    }

    /// Give the group a new identity, as done for pasted copies.
    pub fn regenerate_id(&mut self) {
        self.id = Uuid::new_v4();
    }

    pub fn as_math(&self) -> Option<&MathStack> {
        match &self.content {
            GroupContent::Math(stack) => Some(stack),
            _ => None,
        }
    }

    pub fn as_math_mut(&mut self) -> Option<&mut MathStack> {
        match &mut self.content {
            GroupContent::Math(stack) => Some(stack),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextBlock> {
        match &self.content {
            GroupContent::Text(block) => Some(block),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextBlock> {
        match &mut self.content {
            GroupContent::Text(block) => Some(block),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageContent> {
        match &self.content {
            GroupContent::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_image_mut(&mut self) -> Option<&mut ImageContent> {
        match &mut self.content {
            GroupContent::Image(image) => Some(image),
            _ => None,
        }
    }
}
