//! Rich-text blocks.

use crate::content::TextContent;
use crate::persistence::FormatVersion;
use kurbo::Size;

const DEFAULT_TEXT_WIDTH: f64 = 240.0;
const LINE_HEIGHT: f64 = 24.0;

/// Content of a text group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextBlock {
    pub content: TextContent,
}

impl TextBlock {
    /// An empty block in the encoding used by `version`.
    pub fn new(version: FormatVersion) -> Self {
        Self { content: TextContent::empty(version) }
    }

    pub fn with_content(content: TextContent) -> Self {
        Self { content }
    }

    pub fn is_blank(&self) -> bool {
        self.content.is_blank()
    }

    /// Layout size estimate used before the host measures the block.
    pub fn estimated_size(&self) -> Size {
        Size::new(DEFAULT_TEXT_WIDTH, self.content.line_count() as f64 * LINE_HEIGHT)
    }
}
