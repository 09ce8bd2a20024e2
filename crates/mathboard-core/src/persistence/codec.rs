//! Encoding the registry into envelopes and back.

use super::envelope::{DocumentEnvelope, FormatVersion, GroupRecord};
use crate::content::{TextContent, normalize};
use crate::groups::{Group, GroupContent, GroupKind, ImageContent, MathStack, TextBlock};
use kurbo::{Point, Size};
use serde_json::Value;
use thiserror::Error;

/// Errors reading or writing documents.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not a board document: {0}")]
    NotAnEnvelope(String),
    #[error("Unsupported document version: {0}")]
    UnsupportedVersion(String),
}

/// Parse a stored blob into an envelope.
///
/// Accepts the current `{version, groups}` shape, a bare array of records
/// from before envelopes existed, and `{}` for a blank file. Records that do
/// not parse are skipped with a warning.
pub fn decode_envelope(json: &str) -> Result<DocumentEnvelope, CodecError> {
    let value: Value = serde_json::from_str(json)?;
    let (version, records) = match value {
        Value::Array(records) => (FormatVersion::V2, records),
        Value::Object(mut map) => {
            if map.is_empty() {
                return Ok(DocumentEnvelope::empty(FormatVersion::V2));
            }
            let version = match map.get("version") {
                None | Some(Value::Null) => FormatVersion::V2,
                Some(Value::String(v)) => {
                    FormatVersion::parse(v).ok_or_else(|| CodecError::UnsupportedVersion(v.clone()))?
                }
                Some(other) => return Err(CodecError::UnsupportedVersion(other.to_string())),
            };
            match map.remove("groups") {
                Some(Value::Array(records)) => (version, records),
                Some(_) => return Err(CodecError::NotAnEnvelope("groups is not a list".into())),
                None => return Err(CodecError::NotAnEnvelope("missing groups".into())),
            }
        }
        other => {
            return Err(CodecError::NotAnEnvelope(format!(
                "expected an object or a list, found {}",
                json_kind(&other)
            )));
        }
    };

    let groups = records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value::<GroupRecord>(record) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("skipping malformed group record {index}: {e}");
                None
            }
        })
        .collect();
    Ok(DocumentEnvelope { version, groups })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Serialize an envelope to its stored text.
pub fn encode_envelope(envelope: &DocumentEnvelope) -> Result<String, CodecError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Build the record for one group, writing text in the encoding of `version`.
pub fn record_from_group(group: &Group, version: FormatVersion) -> GroupRecord {
    let mut record = GroupRecord::new(group.kind().as_str(), group.position.x, group.position.y);
    match &group.content {
        GroupContent::Math(stack) => {
            record.fields = Some(stack.latex_sources().into_iter().map(Value::String).collect());
        }
        GroupContent::Text(block) => {
            record.fields = Some(vec![block.content.to_version(version).to_value()]);
        }
        GroupContent::Image(image) => {
            record.image_url = Some(image.url.clone());
            if let Some(size) = image.size {
                record.image_width = Some(size.width);
                record.image_height = Some(size.height);
            }
        }
    }
    record
}

/// Rebuild a group from its record, migrating text to `target`.
///
/// Returns `None` for record types this build does not know.
pub fn group_from_record(record: &GroupRecord, target: FormatVersion) -> Option<Group> {
    let kind = match record.kind.as_deref() {
        None => GroupKind::Math,
        Some(kind) => match GroupKind::parse(kind) {
            Some(kind) => kind,
            None => {
                log::warn!("skipping group of unknown type {kind:?}");
                return None;
            }
        },
    };
    let fields = record.fields.as_deref().unwrap_or_default();
    let content = match kind {
        GroupKind::Math => {
            let sources: Vec<String> = fields
                .iter()
                .map(|field| match field {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect();
            if sources.is_empty() {
                GroupContent::Math(MathStack::new())
            } else {
                GroupContent::Math(MathStack::from_latex(sources))
            }
        }
        GroupKind::Text => {
            let content = fields
                .first()
                .map(|value| normalize(value, target))
                .unwrap_or_else(|| TextContent::empty(target));
            GroupContent::Text(TextBlock::with_content(content))
        }
        GroupKind::Image => {
            let size = match (record.image_width, record.image_height) {
                (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Some(Size::new(w, h)),
                _ => None,
            };
            GroupContent::Image(ImageContent::new(record.image_url.clone().unwrap_or_default(), size))
        }
    };
    Some(Group::new(Point::new(record.left, record.top), content))
}

/// Envelope for a set of groups in z-order.
pub fn envelope_from_groups<'a>(
    groups: impl IntoIterator<Item = &'a Group>,
    version: FormatVersion,
) -> DocumentEnvelope {
    DocumentEnvelope {
        version,
        groups: groups.into_iter().map(|g| record_from_group(g, version)).collect(),
    }
}

/// Groups of an envelope, migrated to the runtime's preferred format.
pub fn groups_from_envelope(envelope: &DocumentEnvelope, target: FormatVersion) -> Vec<Group> {
    envelope
        .groups
        .iter()
        .filter_map(|record| group_from_record(record, target))
        .collect()
}

/// Parse stored text straight into groups.
pub fn decode(json: &str, target: FormatVersion) -> Result<Vec<Group>, CodecError> {
    let envelope = decode_envelope(json)?;
    Ok(groups_from_envelope(&envelope, target))
}

/// Serialize groups straight to stored text.
pub fn encode<'a>(
    groups: impl IntoIterator<Item = &'a Group>,
    version: FormatVersion,
) -> Result<String, CodecError> {
    encode_envelope(&envelope_from_groups(groups, version))
}

/// Version declared by a stored blob, if it is a readable document.
pub fn detect_version(json: &str) -> Option<FormatVersion> {
    decode_envelope(json).ok().map(|envelope| envelope.version)
}
