//! A user's document catalog over the gateway's metadata table.

use crate::editors::EditorCapabilities;
use crate::persistence::{self, DocumentEnvelope, DocumentRef, FormatVersion};
use crate::storage::{FileRecord, StorageError, StorageGateway, StorageResult};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Lists and manages the files owned by one user.
pub struct DocumentLibrary<S: StorageGateway> {
    storage: Arc<S>,
    owner_id: String,
}

impl<S: StorageGateway> DocumentLibrary<S> {
    pub fn new(storage: Arc<S>, owner_id: impl Into<String>) -> Self {
        Self {
            storage,
            owner_id: owner_id.into(),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Reference used to open a file.
    pub fn document_ref(&self, id: &str) -> DocumentRef {
        DocumentRef::new(self.owner_id.as_str(), id)
    }

    /// All files, sorted by name.
    pub async fn list(&self) -> StorageResult<Vec<FileRecord>> {
        let mut records = self.storage.list_records(&self.owner_id).await?;
        records.sort_by(|a, b| {
            a.file_name
                .to_lowercase()
                .cmp(&b.file_name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(records)
    }

    /// Create an empty file in the format the editors save.
    pub async fn create_blank(&self, name: &str, capabilities: EditorCapabilities) -> StorageResult<FileRecord> {
        let name = self.validate_name(name, None).await?;
        self.store_new(name, "{}".to_string(), capabilities.save_version())
            .await
    }

    /// Create a file from uploaded document text.
    ///
    /// The text must be a readable document; it is stored unchanged.
    pub async fn create_from_json(&self, name: &str, json: &str) -> StorageResult<FileRecord> {
        let envelope: DocumentEnvelope = persistence::decode_envelope(json)?;
        let name = self.validate_name(name, None).await?;
        self.store_new(name, json.to_string(), envelope.version).await
    }

    async fn store_new(&self, name: String, blob: String, version: FormatVersion) -> StorageResult<FileRecord> {
        let id = Uuid::new_v4().to_string();
        let mut record = FileRecord::new(self.owner_id.as_str(), id.as_str(), name, version.major());
        record.file_size = blob.len() as u64;
        self.storage
            .upload(&self.document_ref(&id).path(), &blob)
            .await?;
        self.storage.upsert_record(&record).await?;
        log::info!("created {} ({})", record.file_name, record.id);
        Ok(record)
    }

    /// Rename a file. Names are trimmed, non-empty and unique per owner.
    pub async fn rename(&self, id: &str, name: &str) -> StorageResult<FileRecord> {
        let name = self.validate_name(name, Some(id)).await?;
        let mut record = self.storage.select_record(&self.owner_id, id).await?;
        record.file_name = name;
        record.last_modified = Utc::now();
        self.storage.upsert_record(&record).await?;
        Ok(record)
    }

    /// Delete a file. A blob that cannot be removed is only logged.
    pub async fn delete(&self, id: &str) -> StorageResult<()> {
        let path = self.document_ref(id).path();
        if let Err(e) = self.storage.remove(&path).await {
            log::warn!("failed to remove blob {}: {}", path, e);
        }
        self.storage.delete_record(&self.owner_id, id).await
    }

    /// Stored document text of a file.
    pub async fn download(&self, id: &str) -> StorageResult<String> {
        self.storage.download(&self.document_ref(id).path()).await
    }

    async fn validate_name(&self, name: &str, except: Option<&str>) -> StorageResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::InvalidName("file name is empty".to_string()));
        }
        let taken = self
            .storage
            .list_records(&self.owner_id)
            .await?
            .iter()
            .any(|r| Some(r.id.as_str()) != except && r.file_name == name);
        if taken {
            return Err(StorageError::Conflict(format!("a file named {} already exists", name)));
        }
        Ok(name.to_string())
    }
}

/// File name offered when a document is downloaded.
pub fn download_file_name(file_name: &str) -> String {
    let stem: String = file_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim();
    let stem = if stem.is_empty() { "document" } else { stem };
    let stem = stem.strip_suffix("_json").unwrap_or(stem);
    format!("{}.json", stem)
}
