//! Storage gateway abstraction for persistence.
//!
//! A gateway stores document blobs at paths and keeps a metadata table of
//! file records keyed by owner and document id.

mod autosave;
mod library;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use autosave::{AutoSaveManager, SaveOutcome, SaveTicket, SavedInfo};
pub use library::{DocumentLibrary, download_file_name};
pub use memory::MemoryGateway;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileGateway;

use crate::persistence::CodecError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Storage error: {0}")]
    Other(String),
}

impl From<CodecError> for StorageError {
    fn from(e: CodecError) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// One row of the metadata table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub user_id: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    /// Blob size in bytes.
    pub file_size: u64,
    /// Major format version of the stored document.
    pub version: u32,
}

impl FileRecord {
    pub fn new(user_id: impl Into<String>, id: impl Into<String>, file_name: impl Into<String>, version: u32) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            user_id: user_id.into(),
            file_name: file_name.into(),
            created_at: now,
            last_modified: now,
            file_size: 0,
            version,
        }
    }
}

/// Trait for storage gateways.
///
/// Note: On native platforms, implementations must be Send + Sync.
/// On WASM, these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait StorageGateway: Send + Sync {
    /// Store a blob, replacing any previous one at `path`.
    fn upload(&self, path: &str, blob: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// Fetch a blob.
    fn download(&self, path: &str) -> BoxFuture<'_, StorageResult<String>>;

    /// Delete a blob.
    fn remove(&self, path: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// Insert or replace a metadata row.
    fn upsert_record(&self, record: &FileRecord) -> BoxFuture<'_, StorageResult<()>>;

    /// Fetch a metadata row.
    fn select_record(&self, owner_id: &str, id: &str) -> BoxFuture<'_, StorageResult<FileRecord>>;

    /// Delete a metadata row.
    fn delete_record(&self, owner_id: &str, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// All metadata rows of an owner.
    fn list_records(&self, owner_id: &str) -> BoxFuture<'_, StorageResult<Vec<FileRecord>>>;
}

/// Trait for storage gateways (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait StorageGateway {
    /// Store a blob, replacing any previous one at `path`.
    fn upload(&self, path: &str, blob: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// Fetch a blob.
    fn download(&self, path: &str) -> BoxFuture<'_, StorageResult<String>>;

    /// Delete a blob.
    fn remove(&self, path: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// Insert or replace a metadata row.
    fn upsert_record(&self, record: &FileRecord) -> BoxFuture<'_, StorageResult<()>>;

    /// Fetch a metadata row.
    fn select_record(&self, owner_id: &str, id: &str) -> BoxFuture<'_, StorageResult<FileRecord>>;

    /// Delete a metadata row.
    fn delete_record(&self, owner_id: &str, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// All metadata rows of an owner.
    fn list_records(&self, owner_id: &str) -> BoxFuture<'_, StorageResult<Vec<FileRecord>>>;
}

/// Simple blocking executor for tests.
#[cfg(test)]
pub(crate) fn block_on<F: Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn dummy_raw_waker() -> RawWaker {
        fn no_op(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            dummy_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = std::pin::pin!(f);

    loop {
        if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
            return result;
        }
    }
}
