//! Text group content: the structured and legacy encodings, format detection
//! and migration between them.

mod convert;
mod legacy;
mod rich;

pub use convert::{
    Segment, legacy_to_rich, legacy_to_segments, rich_to_legacy, rich_to_segments,
    segments_to_legacy, segments_to_plain, segments_to_rich,
};
pub use legacy::{LegacyMathField, LegacyText, SENTINEL};
pub use rich::{Mark, RichDoc, RichNode};

use crate::persistence::FormatVersion;
use serde_json::Value;

/// Shape of a stored text value, found by structural inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    /// Null, empty string or another falsy value.
    Empty,
    /// A bare string from the oldest documents.
    LegacyString,
    /// `{ text, mathFields }`.
    OptimizedV2,
    /// `{ type, content }` tree.
    StructuredV3,
    Unknown,
}

/// Classify a stored text value.
pub fn detect_format(value: &Value) -> ContentFormat {
    match value {
        Value::Null | Value::Bool(false) => ContentFormat::Empty,
        Value::String(s) if s.is_empty() => ContentFormat::Empty,
        Value::String(_) => ContentFormat::LegacyString,
        Value::Number(n) if n.as_f64() == Some(0.0) => ContentFormat::Empty,
        Value::Object(map) if map.contains_key("text") && map.contains_key("mathFields") => {
            ContentFormat::OptimizedV2
        }
        Value::Object(map) if map.contains_key("type") && map.contains_key("content") => {
            ContentFormat::StructuredV3
        }
        _ => ContentFormat::Unknown,
    }
}

/// In-memory text content in either encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum TextContent {
    Rich(RichDoc),
    Legacy(LegacyText),
}

impl Default for TextContent {
    fn default() -> Self {
        TextContent::Rich(RichDoc::default())
    }
}

impl TextContent {
    /// Empty content in the encoding used by `version`.
    pub fn empty(version: FormatVersion) -> Self {
        match version {
            FormatVersion::V3 => TextContent::Rich(RichDoc::default()),
            FormatVersion::V2 => TextContent::Legacy(LegacyText::default()),
        }
    }

    /// The encoding this content is held in.
    pub fn version(&self) -> FormatVersion {
        match self {
            TextContent::Rich(_) => FormatVersion::V3,
            TextContent::Legacy(_) => FormatVersion::V2,
        }
    }

    /// Structured view; legacy content is migrated.
    pub fn to_rich(&self) -> RichDoc {
        match self {
            TextContent::Rich(doc) => doc.clone(),
            TextContent::Legacy(legacy) => legacy_to_rich(legacy),
        }
    }

    /// Legacy view; structured content is flattened and loses its marks.
    pub fn to_legacy(&self) -> LegacyText {
        match self {
            TextContent::Rich(doc) => rich_to_legacy(doc),
            TextContent::Legacy(legacy) => legacy.clone(),
        }
    }

    /// Convert to the encoding of `version`.
    pub fn to_version(&self, version: FormatVersion) -> Self {
        match version {
            FormatVersion::V3 => TextContent::Rich(self.to_rich()),
            FormatVersion::V2 => TextContent::Legacy(self.to_legacy()),
        }
    }

    /// Flattened segments.
    pub fn segments(&self) -> Vec<Segment> {
        match self {
            TextContent::Rich(doc) => rich_to_segments(doc),
            TextContent::Legacy(legacy) => legacy_to_segments(legacy),
        }
    }

    /// Number of lines when laid out.
    pub fn line_count(&self) -> usize {
        match self {
            TextContent::Rich(doc) => doc.block_count().max(1),
            TextContent::Legacy(legacy) => legacy.text.split('\n').count(),
        }
    }

    /// Whether there is neither text nor math.
    pub fn is_blank(&self) -> bool {
        match self {
            TextContent::Rich(doc) => doc.is_blank(),
            TextContent::Legacy(legacy) => {
                legacy.math_fields.is_empty() && legacy.text.trim().is_empty()
            }
        }
    }

    /// Stored JSON shape.
    pub fn to_value(&self) -> Value {
        match self {
            TextContent::Rich(doc) => doc.to_value(),
            TextContent::Legacy(legacy) => legacy.to_value(),
        }
    }
}

/// Read any stored text value and migrate it to the encoding of `target`.
///
/// Never fails: unreadable content degrades to empty or plain text.
pub fn normalize(value: &Value, target: FormatVersion) -> TextContent {
    let content = match detect_format(value) {
        ContentFormat::Empty => return TextContent::empty(target),
        ContentFormat::Unknown => {
            log::warn!("unrecognized text content, starting empty");
            return TextContent::empty(target);
        }
        ContentFormat::LegacyString => {
            TextContent::Legacy(LegacyText::plain(value.as_str().unwrap_or_default()))
        }
        ContentFormat::OptimizedV2 => TextContent::Legacy(LegacyText::from_value(value)),
        ContentFormat::StructuredV3 => match RichDoc::from_value(value) {
            Ok(doc) => TextContent::Rich(doc),
            Err(e) => {
                log::warn!("malformed structured text content: {e}");
                return TextContent::empty(target);
            }
        },
    };
    if content.version() == target {
        content
    } else {
        content.to_version(target)
    }
}
