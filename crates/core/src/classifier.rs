use crate::models::ClassificationRecord;
use providers::{MediaClassification, MediaClassifier, MediaFile, ProviderError};
use std::time::Instant;
use tracing::{info, warn};

/// Result of `HistoryManager::submit`.
#[derive(Debug, Clone)]
pub enum ClassificationOutcome {
    /// Newly classified and stored.
    Recorded(ClassificationRecord),
    /// An equivalent record was already in history; nothing was written.
    CacheHit(ClassificationRecord),
    /// A newer request replaced this one while it was in flight.
    Superseded,
}

impl ClassificationOutcome {
    pub fn record(&self) -> Option<&ClassificationRecord> {
        match self {
            ClassificationOutcome::Recorded(r) | ClassificationOutcome::CacheHit(r) => Some(r),
            ClassificationOutcome::Superseded => None,
        }
    }

    pub fn is_cache_hit(&self) -> bool {
        matches!(self, ClassificationOutcome::CacheHit(_))
    }
}

/// Content fingerprint of an upload (blake3, hex).
pub fn fingerprint(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

pub async fn classify(
    file: &MediaFile,
    classifier: &dyn MediaClassifier,
) -> Result<MediaClassification, ProviderError> {
    let started = Instant::now();
    let result = classifier.classify(file).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(MediaClassification::Classified {
            genre, confidence, ..
        }) => info!(filename = %file.filename, genre = %genre, confidence, elapsed_ms, "classified"),
        Ok(MediaClassification::NoAudio) => {
            info!(filename = %file.filename, elapsed_ms, "no audio track detected")
        }
        Err(e) => warn!(filename = %file.filename, error = %e, elapsed_ms, "classification failed"),
    }
    result
}
