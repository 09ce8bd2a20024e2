//! File-based storage gateway for native platforms.

use super::{BoxFuture, FileRecord, StorageError, StorageGateway, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};

/// File-based gateway for native platforms.
///
/// Blobs live under `blobs/` at their storage path. Each metadata row is a
/// JSON file at `records/<owner>/<id>.json`.
pub struct FileGateway {
    /// Base directory for all stored data.
    base_path: PathBuf,
}

impl FileGateway {
    /// Create a new gateway with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create a gateway in the default location.
    ///
    /// On Unix: `~/.local/share/mathboard/`
    /// On Windows: `%LOCALAPPDATA%\mathboard\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("mathboard"))
    }

    /// Get the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn blob_path(&self, path: &str) -> StorageResult<PathBuf> {
        let mut full = self.base_path.join("blobs");
        for segment in path.split('/') {
            full.push(sanitize_segment(segment)?);
        }
        Ok(full)
    }

    fn owner_dir(&self, owner_id: &str) -> StorageResult<PathBuf> {
        Ok(self.base_path.join("records").join(sanitize_segment(owner_id)?))
    }

    fn record_path(&self, owner_id: &str, id: &str) -> StorageResult<PathBuf> {
        Ok(self
            .owner_dir(owner_id)?
            .join(format!("{}.json", sanitize_segment(id)?)))
    }
}

/// Make one path segment safe for the filesystem.
fn sanitize_segment(segment: &str) -> StorageResult<String> {
    let safe: String = segment
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.is_empty() || safe == "." || safe == ".." {
        return Err(StorageError::InvalidName(segment.to_string()));
    }
    Ok(safe)
}

fn write_file(path: &Path, contents: &str) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            StorageError::Io(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }
    fs::write(path, contents)
        .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
}

fn remove_file(path: &Path) -> StorageResult<()> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| {
            StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
        })?;
    }
    Ok(())
}

fn read_record(path: &Path) -> StorageResult<FileRecord> {
    let json = fs::read_to_string(path)
        .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&json).map_err(|e| {
        StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
    })
}

impl StorageGateway for FileGateway {
    fn upload(&self, path: &str, blob: &str) -> BoxFuture<'_, StorageResult<()>> {
        let target = self.blob_path(path);
        let blob = blob.to_string();
        Box::pin(async move { write_file(&target?, &blob) })
    }

    fn download(&self, path: &str) -> BoxFuture<'_, StorageResult<String>> {
        let target = self.blob_path(path);
        let path = path.to_string();
        Box::pin(async move {
            let target = target?;
            if !target.exists() {
                return Err(StorageError::NotFound(path));
            }
            fs::read_to_string(&target).map_err(|e| {
                StorageError::Io(format!("Failed to read {}: {}", target.display(), e))
            })
        })
    }

    fn remove(&self, path: &str) -> BoxFuture<'_, StorageResult<()>> {
        let target = self.blob_path(path);
        Box::pin(async move { remove_file(&target?) })
    }

    fn upsert_record(&self, record: &FileRecord) -> BoxFuture<'_, StorageResult<()>> {
        let target = self.record_path(&record.user_id, &record.id);
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| StorageError::Serialization(e.to_string()));
        Box::pin(async move { write_file(&target?, &json?) })
    }

    fn select_record(&self, owner_id: &str, id: &str) -> BoxFuture<'_, StorageResult<FileRecord>> {
        let target = self.record_path(owner_id, id);
        let key = format!("{}/{}", owner_id, id);
        Box::pin(async move {
            let target = target?;
            if !target.exists() {
                return Err(StorageError::NotFound(key));
            }
            read_record(&target)
        })
    }

    fn delete_record(&self, owner_id: &str, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let target = self.record_path(owner_id, id);
        Box::pin(async move { remove_file(&target?) })
    }

    fn list_records(&self, owner_id: &str) -> BoxFuture<'_, StorageResult<Vec<FileRecord>>> {
        let dir = self.owner_dir(owner_id);
        Box::pin(async move {
            let dir = dir?;
            if !dir.exists() {
                return Ok(vec![]);
            }
            let entries = fs::read_dir(&dir)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

            let mut records = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|e| e == "json") {
                    match read_record(&path) {
                        Ok(record) => records.push(record),
                        Err(e) => log::warn!("skipping unreadable record: {}", e),
                    }
                }
            }
            Ok(records)
        })
    }
}
