//! Structured (3.0) text documents: a tree of block nodes holding text runs
//! and atomic inline math leaves.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DOC: &str = "doc";
pub const PARAGRAPH: &str = "paragraph";
pub const TEXT: &str = "text";
pub const MATH: &str = "math";
pub const HARD_BREAK: &str = "hardBreak";

/// Block node types that end a line when flattened.
const TEXTBLOCKS: &[&str] = &[PARAGRAPH, "heading", "codeBlock"];

/// A style mark on a text run (bold, italic, link...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Value>,
}

impl Mark {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), attrs: None }
    }
}

/// A node of the structured document tree.
///
/// Node types this crate does not know are kept verbatim so a load/save cycle
/// never drops editor content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichNode {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<RichNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
    /// Any other keys the editor stored on the node.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RichNode {
    fn bare(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            text: None,
            attrs: None,
            content: Vec::new(),
            marks: Vec::new(),
            extra: Map::new(),
        }
    }

    /// A paragraph with the given inline children.
    pub fn paragraph(content: Vec<RichNode>) -> Self {
        Self { content, ..Self::bare(PARAGRAPH) }
    }

    /// A plain text run.
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Self::bare(TEXT) }
    }

    /// A styled text run.
    pub fn styled_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self { marks, ..Self::text(text) }
    }

    /// An inline math leaf.
    pub fn math(latex: impl Into<String>) -> Self {
        let mut attrs = Map::new();
        attrs.insert("latex".to_string(), Value::String(latex.into()));
        Self { attrs: Some(Value::Object(attrs)), ..Self::bare(MATH) }
    }

    /// A line break inside a paragraph.
    pub fn hard_break() -> Self {
        Self::bare(HARD_BREAK)
    }

    pub fn is_text(&self) -> bool {
        self.kind == TEXT
    }

    pub fn is_math(&self) -> bool {
        self.kind == MATH
    }

    /// Whether flattening this node ends a line.
    pub fn is_textblock(&self) -> bool {
        TEXTBLOCKS.contains(&self.kind.as_str())
    }

    /// The equation source of a math leaf; empty when absent.
    pub fn latex(&self) -> &str {
        self.attrs
            .as_ref()
            .and_then(|attrs| attrs.get("latex"))
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

/// Root of a structured text document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichDoc {
    #[serde(rename = "type", default = "doc_kind")]
    kind: String,
    #[serde(default)]
    pub content: Vec<RichNode>,
}

fn doc_kind() -> String {
    DOC.to_string()
}

impl Default for RichDoc {
    /// A document with one empty paragraph.
    fn default() -> Self {
        Self::new(vec![RichNode::paragraph(Vec::new())])
    }
}

impl RichDoc {
    pub fn new(content: Vec<RichNode>) -> Self {
        Self { kind: doc_kind(), content }
    }

    /// Parse a document from a JSON value.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Whether the document holds no text and no math.
    pub fn is_blank(&self) -> bool {
        fn blank(node: &RichNode) -> bool {
            if node.is_math() {
                return false;
            }
            if node.text.as_deref().is_some_and(|t| !t.trim().is_empty()) {
                return false;
            }
            node.content.iter().all(blank)
        }
        self.content.iter().all(blank)
    }

    /// Number of top-level blocks.
    pub fn block_count(&self) -> usize {
        self.content.len()
    }
}
