//! In-memory storage gateway.

use super::{BoxFuture, FileRecord, StorageError, StorageGateway, StorageResult};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory gateway for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryGateway {
    blobs: RwLock<HashMap<String, String>>,
    records: RwLock<HashMap<(String, String), FileRecord>>,
    offline: AtomicBool,
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl MemoryGateway {
    /// Create a new empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with an IO error until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> StorageResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StorageError::Io("gateway offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl StorageGateway for MemoryGateway {
    fn upload(&self, path: &str, blob: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = path.to_string();
        let blob = blob.to_string();
        Box::pin(async move {
            self.check_online()?;
            let mut blobs = self.blobs.write().map_err(lock_error)?;
            blobs.insert(path, blob);
            Ok(())
        })
    }

    fn download(&self, path: &str) -> BoxFuture<'_, StorageResult<String>> {
        let path = path.to_string();
        Box::pin(async move {
            self.check_online()?;
            let blobs = self.blobs.read().map_err(lock_error)?;
            blobs.get(&path).cloned().ok_or(StorageError::NotFound(path))
        })
    }

    fn remove(&self, path: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = path.to_string();
        Box::pin(async move {
            self.check_online()?;
            let mut blobs = self.blobs.write().map_err(lock_error)?;
            blobs.remove(&path);
            Ok(())
        })
    }

    fn upsert_record(&self, record: &FileRecord) -> BoxFuture<'_, StorageResult<()>> {
        let record = record.clone();
        Box::pin(async move {
            self.check_online()?;
            let mut records = self.records.write().map_err(lock_error)?;
            records.insert((record.user_id.clone(), record.id.clone()), record);
            Ok(())
        })
    }

    fn select_record(&self, owner_id: &str, id: &str) -> BoxFuture<'_, StorageResult<FileRecord>> {
        let key = (owner_id.to_string(), id.to_string());
        Box::pin(async move {
            self.check_online()?;
            let records = self.records.read().map_err(lock_error)?;
            records
                .get(&key)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(format!("{}/{}", key.0, key.1)))
        })
    }

    fn delete_record(&self, owner_id: &str, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let key = (owner_id.to_string(), id.to_string());
        Box::pin(async move {
            self.check_online()?;
            let mut records = self.records.write().map_err(lock_error)?;
            records.remove(&key);
            Ok(())
        })
    }

    fn list_records(&self, owner_id: &str) -> BoxFuture<'_, StorageResult<Vec<FileRecord>>> {
        let owner_id = owner_id.to_string();
        Box::pin(async move {
            self.check_online()?;
            let records = self.records.read().map_err(lock_error)?;
            Ok(records
                .values()
                .filter(|r| r.user_id == owner_id)
                .cloned()
                .collect())
        })
    }
}
