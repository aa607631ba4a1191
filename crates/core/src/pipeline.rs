//! Wiring from `AppConfig` to a ready `HistoryManager`.

use crate::blobstore::{BlobStore, MemoryBlobStore, SqliteBlobStore};
use crate::config::AppConfig;
use crate::history::HistoryManager;
use crate::metadata_log::MetadataLog;
use anyhow::Context;
use providers::noop::NoopClassifier;
use providers::remote::{RemoteClassifier, RemoteConfig};
use providers::ProviderRegistry;
use std::sync::Arc;
use std::time::Duration;
use storage::{connect, migrate};
use tracing::{info, warn};

pub async fn open_history(config: &AppConfig) -> anyhow::Result<HistoryManager> {
    let blobs = build_blob_store(config).await?;
    let log = if config.storage.backend == "memory" {
        MetadataLog::in_memory(config.history.capacity)
    } else {
        let (log, overflow) =
            MetadataLog::open(&config.storage.metadata_path, config.history.capacity)
                .context("open metadata log")?;
        if !overflow.is_empty() {
            info!(dropped = overflow.len(), "metadata log truncated to capacity");
        }
        log
    };

    let registry = build_registry(config)?;
    let classifier = registry.classifier(None)?;
    let manager = HistoryManager::open(blobs, log, classifier)
        .await
        .context("reconcile history")?;
    Ok(manager)
}

pub fn build_registry(config: &AppConfig) -> anyhow::Result<ProviderRegistry> {
    let mut reg = ProviderRegistry::new().with_classifier("noop", Arc::new(NoopClassifier));

    if !config.classifier.base_url.trim().is_empty() {
        let remote = RemoteClassifier::new(RemoteConfig {
            base_url: config.classifier.base_url.clone(),
            endpoint: config.classifier.endpoint.clone(),
            timeout: Duration::from_secs(config.classifier.timeout_secs.max(1)),
        })?;
        reg = reg.with_classifier("remote", Arc::new(remote));
    } else if config.classifier.provider == "remote" {
        warn!("remote classifier selected but no base_url configured");
    }

    Ok(reg.set_preferred_classifier(&config.classifier.provider))
}

pub async fn build_blob_store(config: &AppConfig) -> anyhow::Result<Arc<dyn BlobStore>> {
    match config.storage.backend.as_str() {
        "memory" => Ok(Arc::new(
            MemoryBlobStore::new().with_quota(config.storage.max_blob_bytes),
        )),
        _ => {
            let pool = connect(&config.storage.database).await.context("db connect")?;
            migrate(&pool).await.context("db migrate")?;
            Ok(Arc::new(
                SqliteBlobStore::new(pool).with_quota(config.storage.max_blob_bytes),
            ))
        }
    }
}
