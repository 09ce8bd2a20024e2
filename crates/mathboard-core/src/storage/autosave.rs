//! Debounced autosave for the open document.
//!
//! Every mutation marks the document dirty and re-arms a short coalescing
//! window. When the window elapses the whole envelope is written as one blob
//! and the metadata row is updated. Each attempt carries a sequence number;
//! completions older than the newest applied one are dropped.

use crate::canvas::Canvas;
use crate::config::BoardConfig;
use crate::groups::Group;
use crate::persistence::{self, DocumentEnvelope, DocumentRef, FormatVersion};
use crate::storage::{FileRecord, StorageError, StorageGateway, StorageResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// A save ready to be sent to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveTicket {
    pub seq: u64,
    pub document: DocumentRef,
    pub version: FormatVersion,
    pub blob: String,
}

/// What a successful save wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedInfo {
    pub saved_at: DateTime<Utc>,
    pub size: u64,
}

/// Completion of one save attempt.
#[derive(Debug)]
pub struct SaveOutcome {
    pub seq: u64,
    pub result: StorageResult<SavedInfo>,
}

impl SaveTicket {
    /// Upload the blob, then update the metadata row.
    pub async fn execute<S: StorageGateway + ?Sized>(self, storage: &S) -> SaveOutcome {
        let seq = self.seq;
        let result = self.write(storage).await;
        SaveOutcome { seq, result }
    }

    async fn write<S: StorageGateway + ?Sized>(self, storage: &S) -> StorageResult<SavedInfo> {
        let doc = &self.document;
        storage.upload(&doc.path(), &self.blob).await?;

        let mut record = match storage.select_record(&doc.owner_id, &doc.document_id).await {
            Ok(record) => record,
            Err(StorageError::NotFound(_)) => FileRecord::new(
                doc.owner_id.as_str(),
                doc.document_id.as_str(),
                doc.document_id.as_str(),
                self.version.major(),
            ),
            Err(e) => return Err(e),
        };
        let info = SavedInfo {
            saved_at: Utc::now(),
            size: self.blob.len() as u64,
        };
        record.last_modified = info.saved_at;
        record.file_size = info.size;
        record.version = self.version.major();
        storage.upsert_record(&record).await?;
        Ok(info)
    }
}

/// Manages automatic persistence of the open document.
pub struct AutoSaveManager<S: StorageGateway> {
    /// Storage gateway.
    storage: Arc<S>,
    /// Coalescing window.
    debounce: Duration,
    /// When the pending save becomes due.
    deadline: Option<Instant>,
    /// Whether the document has unsaved changes.
    dirty: bool,
    document: Option<DocumentRef>,
    next_seq: u64,
    applied_seq: u64,
    last_saved: Option<SavedInfo>,
}

impl<S: StorageGateway> AutoSaveManager<S> {
    /// Create a manager with the default debounce window.
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            debounce: Duration::from_millis(crate::config::DEFAULT_DEBOUNCE_MS),
            deadline: None,
            dirty: false,
            document: None,
            next_seq: 0,
            applied_seq: 0,
            last_saved: None,
        }
    }

    /// Create a manager using the debounce window of a board configuration.
    pub fn with_config(storage: Arc<S>, config: &BoardConfig) -> Self {
        let mut manager = Self::new(storage);
        manager.debounce = config.autosave_debounce();
        manager
    }

    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Set the document saves go to.
    pub fn set_document(&mut self, document: Option<DocumentRef>) {
        self.document = document;
    }

    pub fn document(&self) -> Option<&DocumentRef> {
        self.document.as_ref()
    }

    /// Get a reference to the storage gateway.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Check if the document has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Effects of the newest applied save.
    pub fn last_saved(&self) -> Option<SavedInfo> {
        self.last_saved
    }

    /// Sequence number of the newest applied completion.
    pub fn applied_seq(&self) -> u64 {
        self.applied_seq
    }

    /// Mark the document dirty and restart the coalescing window.
    pub fn mark_dirty(&mut self) {
        self.mark_dirty_at(Instant::now());
    }

    pub fn mark_dirty_at(&mut self, now: Instant) {
        self.dirty = true;
        self.deadline = Some(now + self.debounce);
    }

    /// Forward a pending save request from the canvas.
    pub fn track(&mut self, canvas: &mut Canvas) -> bool {
        if canvas.take_save_request() {
            self.mark_dirty();
            true
        } else {
            false
        }
    }

    /// Check if the coalescing window has elapsed.
    pub fn should_save(&self) -> bool {
        self.should_save_at(Instant::now())
    }

    pub fn should_save_at(&self, now: Instant) -> bool {
        self.dirty && self.document.is_some() && self.deadline.is_some_and(|d| now >= d)
    }

    /// Serialize the envelope into a numbered save attempt.
    ///
    /// The document counts as clean from here on; a failed attempt marks it
    /// dirty again without re-arming the window.
    pub fn begin_save(&mut self, envelope: &DocumentEnvelope) -> StorageResult<SaveTicket> {
        let document = self
            .document
            .clone()
            .ok_or_else(|| StorageError::Other("no document open".to_string()))?;
        let blob = persistence::encode_envelope(envelope)?;
        self.next_seq += 1;
        self.dirty = false;
        self.deadline = None;
        Ok(SaveTicket {
            seq: self.next_seq,
            document,
            version: envelope.version,
            blob,
        })
    }

    /// Apply a completion. Returns false when it was stale and ignored.
    pub fn finish(&mut self, outcome: SaveOutcome) -> bool {
        if outcome.seq <= self.applied_seq {
            log::warn!(
                "ignoring stale save #{} (newest applied #{})",
                outcome.seq,
                self.applied_seq
            );
            return false;
        }
        self.applied_seq = outcome.seq;
        match outcome.result {
            Ok(info) => {
                log::debug!("save #{} wrote {} bytes", outcome.seq, info.size);
                self.last_saved = Some(info);
            }
            Err(e) => {
                log::error!("save #{} failed: {}", outcome.seq, e);
                self.dirty = true;
            }
        }
        true
    }

    /// Save immediately.
    pub async fn save(&mut self, envelope: &DocumentEnvelope) -> StorageResult<()> {
        let ticket = self.begin_save(envelope)?;
        let storage = Arc::clone(&self.storage);
        let outcome = ticket.execute(storage.as_ref()).await;
        let failure = outcome.result.as_ref().err().map(|e| e.to_string());
        self.finish(outcome);
        match failure {
            Some(message) => Err(StorageError::Io(message)),
            None => Ok(()),
        }
    }

    /// Save if the window elapsed. Returns true if a save was performed.
    pub async fn maybe_save(&mut self, envelope: &DocumentEnvelope) -> StorageResult<bool> {
        if !self.should_save() {
            return Ok(false);
        }
        self.save(envelope).await?;
        Ok(true)
    }

    /// Load a document, migrating it to `target`.
    ///
    /// Any failure falls back to an empty scene.
    pub async fn load(&mut self, document: DocumentRef, target: FormatVersion) -> Vec<Group> {
        let groups = match self.storage.download(&document.path()).await {
            Ok(blob) => match persistence::decode(&blob, target) {
                Ok(groups) => groups,
                Err(e) => {
                    log::warn!("unreadable document {}: {}", document.path(), e);
                    Vec::new()
                }
            },
            Err(e) => {
                log::warn!("failed to load {}: {}", document.path(), e);
                Vec::new()
            }
        };
        self.document = Some(document);
        self.dirty = false;
        self.deadline = None;
        groups
    }

    /// Load a document straight into a canvas.
    pub async fn open(&mut self, document: DocumentRef, canvas: &mut Canvas) -> usize {
        let groups = self.load(document, canvas.save_version()).await;
        let count = groups.len();
        canvas.load_groups(groups);
        count
    }
}
