//! History manager: the single owner of the blob store and metadata log.
//!
//! Callers never touch either store directly. Consistency between the two is
//! procedural: blob before metadata on insert, metadata before blob on delete,
//! and compensating deletes when the second write fails.

use crate::blobstore::BlobStore;
use crate::classifier::{self, fingerprint, ClassificationOutcome};
use crate::error::{HistoryError, HistoryResult, StorageError};
use crate::metadata_log::MetadataLog;
use crate::models::{ClassificationRecord, OriginalFile, Selection};
use providers::{MediaClassifier, MediaFile};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconcileReport {
    pub orphans_removed: usize,
    pub missing_originals: Vec<String>,
}

pub struct HistoryManager {
    blobs: Arc<dyn BlobStore>,
    log: Mutex<MetadataLog>,
    classifier: Arc<dyn MediaClassifier>,
    generation: AtomicU64,
}

impl HistoryManager {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        log: MetadataLog,
        classifier: Arc<dyn MediaClassifier>,
    ) -> Self {
        Self {
            blobs,
            log: Mutex::new(log),
            classifier,
            generation: AtomicU64::new(0),
        }
    }

    /// Build a manager and repair leftovers from interrupted operations.
    pub async fn open(
        blobs: Arc<dyn BlobStore>,
        log: MetadataLog,
        classifier: Arc<dyn MediaClassifier>,
    ) -> HistoryResult<Self> {
        let manager = Self::new(blobs, log, classifier);
        let report = manager.reconcile().await?;
        if report.orphans_removed > 0 || !report.missing_originals.is_empty() {
            info!(
                orphans_removed = report.orphans_removed,
                missing_originals = report.missing_originals.len(),
                "history reconciled"
            );
        }
        Ok(manager)
    }

    /// Classify `file` and remember the result.
    ///
    /// A record with the same filename and identical bytes is returned without
    /// contacting the classifier. After classification, a record with the same
    /// filename and resulting genre is returned without any writes.
    pub async fn submit(&self, file: MediaFile) -> HistoryResult<ClassificationOutcome> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let hash = fingerprint(&file.bytes);

        {
            let log = self.log.lock().await;
            if let Some(hit) = log.find(|r| r.matches_content(&file.filename, &hash)) {
                info!(id = %hit.id, filename = %file.filename, "cache hit on identical upload");
                return Ok(ClassificationOutcome::CacheHit(hit.clone()));
            }
        }

        let result = classifier::classify(&file, self.classifier.as_ref()).await;

        // Late answers for an abandoned request are dropped, failures included.
        if self.generation.load(Ordering::SeqCst) != ticket {
            info!(
                filename = %file.filename,
                ticket,
                failed = result.is_err(),
                "discarding stale classification response"
            );
            return Ok(ClassificationOutcome::Superseded);
        }
        let classification = result?;

        let mut log = self.log.lock().await;
        if let Some(hit) = log.find(|r| r.matches_outcome(&file.filename, classification.genre())) {
            info!(id = %hit.id, filename = %file.filename, "cache hit on filename and genre");
            return Ok(ClassificationOutcome::CacheHit(hit.clone()));
        }

        let record = ClassificationRecord::from_classification(
            file.filename.clone(),
            classification,
            Some(hash),
            file.len() as u64,
        );

        if let Err(e) = self.blobs.put(&record.id, &file.bytes).await {
            warn!(id = %record.id, error = %e, "blob write failed, nothing recorded");
            return Err(HistoryError::Storage(e));
        }

        match log.insert(record.clone()) {
            Ok(Some(evicted)) => {
                debug!(evicted = %evicted, "capacity reached, evicting oldest record");
                if let Err(e) = self.blobs.delete(&evicted).await {
                    warn!(id = %evicted, error = %e, "evicted blob not removed; left for reconcile");
                }
            }
            Ok(None) => {}
            Err(e) => {
                if let Err(del) = self.blobs.delete(&record.id).await {
                    warn!(id = %record.id, error = %del, "rollback of blob failed");
                }
                warn!(id = %record.id, error = %e, "metadata write failed, submit rolled back");
                return Err(HistoryError::Storage(e));
            }
        }

        info!(id = %record.id, filename = %record.filename, "classification recorded");
        Ok(ClassificationOutcome::Recorded(record))
    }

    /// Mark any in-flight `submit` as stale.
    pub fn invalidate_pending(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Metadata plus original bytes; a missing blob degrades to `OriginalFile::Missing`.
    pub async fn select(&self, id: &str) -> HistoryResult<Selection> {
        let record = {
            let log = self.log.lock().await;
            log.get(id).cloned()
        }
        .ok_or_else(|| HistoryError::UnknownRecord(id.to_string()))?;

        let original = OriginalFile::from(self.blobs.get(id).await?);
        if original.is_missing() {
            warn!(id, filename = %record.filename, "original file missing");
        }
        Ok(Selection { record, original })
    }

    /// Remove a record from both stores. Returns whether metadata existed.
    pub async fn delete(&self, id: &str) -> HistoryResult<bool> {
        let mut log = self.log.lock().await;
        let removed = log.remove(id)?;
        self.blobs.delete(id).await?;
        if removed.is_some() {
            info!(id, "record deleted");
        }
        Ok(removed.is_some())
    }

    pub async fn clear_all(&self) -> HistoryResult<()> {
        let mut log = self.log.lock().await;
        log.clear()?;
        self.blobs.clear().await?;
        info!("history cleared");
        Ok(())
    }

    pub async fn storage_footprint(&self) -> HistoryResult<String> {
        let total = self.blobs.total_size().await?;
        Ok(format_footprint(total))
    }

    /// Snapshot of the metadata log, most recent first.
    pub async fn records(&self) -> Vec<ClassificationRecord> {
        self.log.lock().await.list().to_vec()
    }

    pub async fn len(&self) -> usize {
        self.log.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.log.lock().await.is_empty()
    }

    pub async fn capacity(&self) -> usize {
        self.log.lock().await.capacity()
    }

    /// Read-only blob lookup for exporters.
    pub async fn original_file(&self, id: &str) -> Result<OriginalFile, StorageError> {
        Ok(self.blobs.get(id).await?.into())
    }

    pub async fn missing_originals(&self) -> HistoryResult<Vec<String>> {
        let stored: HashSet<String> = self.blobs.ids().await?.into_iter().collect();
        let log = self.log.lock().await;
        Ok(log
            .list()
            .iter()
            .filter(|r| !stored.contains(&r.id))
            .map(|r| r.id.clone())
            .collect())
    }

    /// Delete blobs with no metadata entry and report records without blobs.
    pub async fn reconcile(&self) -> HistoryResult<ReconcileReport> {
        let log = self.log.lock().await;
        let known: HashSet<&str> = log.list().iter().map(|r| r.id.as_str()).collect();
        let stored = self.blobs.ids().await?;

        let mut report = ReconcileReport::default();
        for id in stored.iter().filter(|id| !known.contains(id.as_str())) {
            self.blobs.delete(id).await?;
            debug!(id = %id, "orphan blob removed");
            report.orphans_removed += 1;
        }
        let stored: HashSet<&str> = stored.iter().map(String::as_str).collect();
        report.missing_originals = log
            .list()
            .iter()
            .filter(|r| !stored.contains(r.id.as_str()))
            .map(|r| r.id.clone())
            .collect();
        Ok(report)
    }
}

/// Human-scaled size: whole KB below 1 MB, one decimal in MB at or above.
pub fn format_footprint(bytes: u64) -> String {
    if bytes == 0 {
        return "0 KB".to_string();
    }
    let kb = bytes as f64 / 1024.0;
    if kb >= 1024.0 {
        format!("{:.1} MB", kb / 1024.0)
    } else {
        format!("{} KB", kb.round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::format_footprint;

    #[test]
    fn footprint_formatting() {
        assert_eq!(format_footprint(0), "0 KB");
        assert_eq!(format_footprint(300), "0 KB");
        assert_eq!(format_footprint(600), "1 KB");
        assert_eq!(format_footprint(20 * 1024), "20 KB");
        assert_eq!(format_footprint(1024 * 1024 - 1), "1024 KB");
        assert_eq!(format_footprint(1024 * 1024), "1.0 MB");
        assert_eq!(format_footprint(5 * 1024 * 1024 + 512 * 1024), "5.5 MB");
    }
}
