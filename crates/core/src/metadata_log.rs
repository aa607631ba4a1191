//! Bounded, most-recent-first list of classification records.
//!
//! The in-memory view is authoritative for callers; every mutation is flushed
//! to a JSON document (temp file + rename) before the call returns. A failed
//! flush restores the previous in-memory state.
//!
//! Flushes are blocking `std::fs` calls made on the caller's thread. The
//! document holds at most `capacity` small records, so the cost is bounded.

use crate::error::StorageError;
use crate::models::ClassificationRecord;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Debug)]
pub struct MetadataLog {
    records: Vec<ClassificationRecord>,
    capacity: usize,
    path: Option<PathBuf>,
}

impl MetadataLog {
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            capacity: capacity.max(1),
            path: None,
        }
    }

    /// Load the log from `path` (empty if the file does not exist).
    ///
    /// Entries beyond `capacity` are dropped and returned so the caller can
    /// release their blobs.
    pub fn open(
        path: impl Into<PathBuf>,
        capacity: usize,
    ) -> Result<(Self, Vec<ClassificationRecord>), StorageError> {
        let path = path.into();
        let mut records: Vec<ClassificationRecord> = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            Vec::new()
        };

        let mut seen = std::collections::HashSet::new();
        records.retain(|r| seen.insert(r.id.clone()));

        let capacity = capacity.max(1);
        let overflow = if records.len() > capacity {
            records.split_off(capacity)
        } else {
            Vec::new()
        };
        let log = Self {
            records,
            capacity,
            path: Some(path),
        };
        if !overflow.is_empty() {
            warn!(
                dropped = overflow.len(),
                capacity, "metadata log above capacity, truncating"
            );
            log.flush()?;
        }
        Ok((log, overflow))
    }

    pub fn list(&self) -> &[ClassificationRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&ClassificationRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn find<P>(&self, predicate: P) -> Option<&ClassificationRecord>
    where
        P: FnMut(&&ClassificationRecord) -> bool,
    {
        self.records.iter().find(predicate)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Prepend `record`, truncating to capacity. Returns the evicted id.
    pub fn insert(&mut self, record: ClassificationRecord) -> Result<Option<String>, StorageError> {
        let previous = self.records.clone();
        self.records.retain(|r| r.id != record.id);
        self.records.insert(0, record);
        let evicted = if self.records.len() > self.capacity {
            self.records.pop().map(|r| r.id)
        } else {
            None
        };
        debug_assert!(self.records.len() <= self.capacity);
        if let Err(e) = self.flush() {
            self.records = previous;
            return Err(e);
        }
        Ok(evicted)
    }

    /// Remove `id`; unknown ids are a no-op.
    pub fn remove(&mut self, id: &str) -> Result<Option<ClassificationRecord>, StorageError> {
        let Some(pos) = self.records.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        let removed = self.records.remove(pos);
        if let Err(e) = self.flush() {
            self.records.insert(pos, removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        let previous = std::mem::take(&mut self.records);
        if let Err(e) = self.flush() {
            self.records = previous;
            return Err(e);
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let serialized = serde_json::to_vec_pretty(&self.records)?;
        let temp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            file.write_all(&serialized)?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        debug!(path = %path.display(), entries = self.records.len(), "metadata log flushed");
        Ok(())
    }
}
