//! Versioned document persistence.

mod codec;
mod envelope;

pub use codec::{
    CodecError, decode, decode_envelope, detect_version, encode, encode_envelope, envelope_from_groups,
    group_from_record, groups_from_envelope, record_from_group,
};
pub use envelope::{DocumentEnvelope, FormatVersion, GroupRecord, parse_pixels};

use serde::{Deserialize, Serialize};

/// Identifies one stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub owner_id: String,
    pub document_id: String,
}

impl DocumentRef {
    pub fn new(owner_id: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            document_id: document_id.into(),
        }
    }

    /// Blob path in the storage gateway.
    pub fn path(&self) -> String {
        format!("{}/{}.json", self.owner_id, self.document_id)
    }
}
