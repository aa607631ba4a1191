use crate::{MediaClassification, MediaClassifier, MediaFile, ProviderError};

/// Classifier used when no remote endpoint is configured.
#[derive(Debug, Default)]
pub struct NoopClassifier;

#[async_trait::async_trait]
impl MediaClassifier for NoopClassifier {
    async fn classify(&self, _file: &MediaFile) -> Result<MediaClassification, ProviderError> {
        Err(ProviderError::NotImplemented)
    }
}
