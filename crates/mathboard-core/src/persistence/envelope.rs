//! On-disk document shape.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Document format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormatVersion {
    /// Text stored as sentinel text plus a side table.
    #[serde(rename = "2.0")]
    V2,
    /// Text stored as a structured tree.
    #[serde(rename = "3.0")]
    V3,
}

impl FormatVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            FormatVersion::V2 => "2.0",
            FormatVersion::V3 => "3.0",
        }
    }

    pub fn parse(version: &str) -> Option<Self> {
        match version {
            "2.0" => Some(FormatVersion::V2),
            "3.0" => Some(FormatVersion::V3),
            _ => None,
        }
    }

    /// Highest version the runtime's editors can produce.
    pub fn for_editor(structured_text_editor: bool) -> Self {
        if structured_text_editor {
            FormatVersion::V3
        } else {
            FormatVersion::V2
        }
    }

    /// Major number, as kept in the metadata table.
    pub fn major(self) -> u32 {
        match self {
            FormatVersion::V2 => 2,
            FormatVersion::V3 => 3,
        }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CSS pixel coordinates: written as `"120px"`, read from strings or numbers.
mod px {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value}px"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0)),
            Value::String(s) => Ok(parse(&s)),
            Value::Null => Ok(0.0),
            other => Err(serde::de::Error::custom(format!("invalid coordinate: {other}"))),
        }
    }

    /// Unparseable strings read as 0.
    pub fn parse(s: &str) -> f64 {
        let trimmed = s.trim();
        trimmed
            .strip_suffix("px")
            .unwrap_or(trimmed)
            .trim()
            .parse()
            .unwrap_or(0.0)
    }
}

pub use px::parse as parse_pixels;

/// One group as stored.
///
/// `type` is absent in pre-envelope documents, where every record is a math
/// stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, with = "px")]
    pub left: f64,
    #[serde(default, with = "px")]
    pub top: f64,
    /// Math: equation sources. Text: a single content value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<Value>>,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "imageWidth", default, skip_serializing_if = "Option::is_none")]
    pub image_width: Option<f64>,
    #[serde(rename = "imageHeight", default, skip_serializing_if = "Option::is_none")]
    pub image_height: Option<f64>,
}

impl GroupRecord {
    pub fn new(kind: &str, left: f64, top: f64) -> Self {
        Self {
            kind: Some(kind.to_string()),
            left,
            top,
            fields: None,
            image_url: None,
            image_width: None,
            image_height: None,
        }
    }
}

/// A whole saved document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEnvelope {
    pub version: FormatVersion,
    pub groups: Vec<GroupRecord>,
}

impl DocumentEnvelope {
    pub fn empty(version: FormatVersion) -> Self {
        Self { version, groups: Vec::new() }
    }
}
