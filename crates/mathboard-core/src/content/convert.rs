//! Conversions between the structured and legacy text formats.
//!
//! Both directions go through a flat list of [`Segment`]s: text runs (which
//! may contain line breaks) and atomic equations. Legacy sentinel encoding is
//! only produced and consumed at the edges.

use super::legacy::{LegacyMathField, LegacyText, SENTINEL};
use super::rich::{HARD_BREAK, RichDoc, RichNode};
use std::collections::HashMap;

/// One piece of flattened text content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Math(String),
}

/// Append text, merging with a trailing text segment.
fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Text(last)) = segments.last_mut() {
        last.push_str(text);
    } else {
        segments.push(Segment::Text(text.to_string()));
    }
}

fn flatten_node(node: &RichNode, segments: &mut Vec<Segment>) {
    if node.is_text() {
        push_text(segments, node.text.as_deref().unwrap_or_default());
        return;
    }
    if node.is_math() {
        segments.push(Segment::Math(node.latex().to_string()));
        return;
    }
    if node.kind == HARD_BREAK {
        push_text(segments, "\n");
        return;
    }
    for child in &node.content {
        flatten_node(child, segments);
    }
    if node.is_textblock() {
        push_text(segments, "\n");
    }
}

/// Flatten a structured document depth-first.
///
/// Each text block ends with a line break and one trailing break is trimmed.
/// Marks are not represented in segments and are dropped.
pub fn rich_to_segments(doc: &RichDoc) -> Vec<Segment> {
    let mut segments = Vec::new();
    for node in &doc.content {
        flatten_node(node, &mut segments);
    }
    if let Some(Segment::Text(last)) = segments.last_mut() {
        if last.ends_with('\n') {
            last.pop();
        }
        if last.is_empty() {
            segments.pop();
        }
    }
    segments
}

/// Rebuild a structured document, one paragraph per line.
///
/// Always yields at least one paragraph.
pub fn segments_to_rich(segments: &[Segment]) -> RichDoc {
    let mut paragraphs = Vec::new();
    let mut current: Vec<RichNode> = Vec::new();
    for segment in segments {
        match segment {
            Segment::Math(latex) => current.push(RichNode::math(latex.clone())),
            Segment::Text(text) => {
                let mut lines = text.split('\n');
                if let Some(first) = lines.next().filter(|line| !line.is_empty()) {
                    current.push(RichNode::text(first));
                }
                for line in lines {
                    paragraphs.push(RichNode::paragraph(std::mem::take(&mut current)));
                    if !line.is_empty() {
                        current.push(RichNode::text(line));
                    }
                }
            }
        }
    }
    paragraphs.push(RichNode::paragraph(current));
    RichDoc::new(paragraphs)
}

/// Encode segments as sentinel text plus a side table.
pub fn segments_to_legacy(segments: &[Segment]) -> LegacyText {
    let mut legacy = LegacyText::default();
    let mut offset = 0;
    for segment in segments {
        match segment {
            Segment::Text(text) => {
                legacy.text.push_str(text);
                offset += text.encode_utf16().count();
            }
            Segment::Math(latex) => {
                legacy.math_fields.push(LegacyMathField { position: offset, latex: latex.clone() });
                legacy.text.push(SENTINEL);
                offset += SENTINEL.len_utf16();
            }
        }
    }
    legacy
}

/// Decode sentinel text into segments.
///
/// Sentinels are matched to side-table entries by offset; a sentinel with no
/// entry becomes an empty equation.
pub fn legacy_to_segments(legacy: &LegacyText) -> Vec<Segment> {
    let lookup: HashMap<usize, &str> = legacy
        .math_fields
        .iter()
        .map(|field| (field.position, field.latex.as_str()))
        .collect();

    let mut segments = Vec::new();
    let mut run = String::new();
    let mut offset = 0;
    for c in legacy.text.chars() {
        if c == SENTINEL {
            if !run.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut run)));
            }
            let latex = lookup.get(&offset).copied().unwrap_or_else(|| {
                log::warn!("no equation recorded for sentinel at offset {offset}");
                ""
            });
            segments.push(Segment::Math(latex.to_string()));
        } else {
            run.push(c);
        }
        offset += c.len_utf16();
    }
    if !run.is_empty() {
        segments.push(Segment::Text(run));
    }
    segments
}

/// Structured to legacy. Lossy: styling marks are discarded.
pub fn rich_to_legacy(doc: &RichDoc) -> LegacyText {
    segments_to_legacy(&rich_to_segments(doc))
}

/// Legacy to structured.
pub fn legacy_to_rich(legacy: &LegacyText) -> RichDoc {
    segments_to_rich(&legacy_to_segments(legacy))
}

/// Plain text of the segments, equations rendered as their source.
pub fn segments_to_plain(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Text(text) => text.clone(),
            Segment::Math(latex) => format!("${latex}$"),
        })
        .collect()
}
