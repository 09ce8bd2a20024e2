//! Optimized legacy (2.0) text: flat text with one sentinel code point per
//! embedded equation and a side table of offsets.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved code point marking an equation inside legacy text.
pub const SENTINEL: char = '\u{E000}';

/// One embedded equation of a legacy text value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyMathField {
    /// Offset of the sentinel within the text, in UTF-16 code units.
    pub position: usize,
    pub latex: String,
}

/// A 2.0 text value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyText {
    pub text: String,
    #[serde(rename = "mathFields", default)]
    pub math_fields: Vec<LegacyMathField>,
}

impl LegacyText {
    /// Plain text without equations.
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), math_fields: Vec::new() }
    }

    /// Read a legacy value leniently.
    ///
    /// Never fails: a missing `text` reads as empty and malformed
    /// `mathFields` entries are dropped, so sentinels fall back to empty
    /// equations.
    pub fn from_value(value: &Value) -> Self {
        let text = value.get("text").and_then(Value::as_str).unwrap_or_default().to_string();
        let math_fields = match value.get("mathFields") {
            Some(Value::Array(fields)) => fields
                .iter()
                .filter_map(|field| {
                    let position = field.get("position")?.as_u64()?;
                    let latex = field.get("latex").and_then(Value::as_str).unwrap_or_default();
                    Some(LegacyMathField { position: position as usize, latex: latex.to_string() })
                })
                .collect(),
            Some(_) => {
                log::warn!("malformed mathFields table, reading legacy text as plain text");
                Vec::new()
            }
            None => Vec::new(),
        };
        Self { text, math_fields }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Number of sentinel code points in the text.
    pub fn sentinel_count(&self) -> usize {
        self.text.chars().filter(|&c| c == SENTINEL).count()
    }

    /// Whether the side table matches the sentinels one to one.
    pub fn is_consistent(&self) -> bool {
        let mut offset = 0;
        let mut sentinels = Vec::new();
        for c in self.text.chars() {
            if c == SENTINEL {
                sentinels.push(offset);
            }
            offset += c.len_utf16();
        }
        sentinels.len() == self.math_fields.len()
            && sentinels.iter().zip(&self.math_fields).all(|(&pos, field)| pos == field.position)
    }

    /// Length of the text in UTF-16 code units.
    pub fn utf16_len(&self) -> usize {
        self.text.encode_utf16().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let legacy = LegacyText {
            text: format!("a{SENTINEL}b"),
            math_fields: vec![LegacyMathField { position: 1, latex: "x^2".into() }],
        };
        assert_eq!(
            legacy.to_value(),
            json!({ "text": "a\u{E000}b", "mathFields": [{ "position": 1, "latex": "x^2" }] })
        );
        assert!(legacy.is_consistent());
    }

    #[test]
    fn test_lenient_read() {
        let value = json!({ "text": "q\u{E000}", "mathFields": [{ "latex": "no position" }, { "position": 1 }] });
        let legacy = LegacyText::from_value(&value);
        assert_eq!(legacy.math_fields, vec![LegacyMathField { position: 1, latex: String::new() }]);

        let broken = LegacyText::from_value(&json!({ "text": "plain", "mathFields": "oops" }));
        assert_eq!(broken, LegacyText::plain("plain"));
    }

    #[test]
    fn test_positions_count_utf16_units() {
        let legacy = LegacyText {
            text: format!("\u{1D465}{SENTINEL}"),
            math_fields: vec![LegacyMathField { position: 2, latex: "y".into() }],
        };
        assert!(legacy.is_consistent());
        assert_eq!(legacy.utf16_len(), 3);
    }
}
