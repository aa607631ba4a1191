use crate::{
    ClassifyMediaResponse, MediaClassification, MediaClassifier, MediaFile, ProviderError,
    GENERIC_FAILURE,
};
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Multipart field the classification endpoint reads the upload from.
const FILE_FIELD: &str = "media_file";

#[derive(Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }
}

/// Classifier backed by the HTTP `classify-media` endpoint.
#[derive(Clone)]
pub struct RemoteClassifier {
    client: Client,
    cfg: Arc<RemoteConfig>,
}

impl RemoteClassifier {
    pub fn new(cfg: RemoteConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            cfg: Arc::new(cfg),
        })
    }
}

#[async_trait::async_trait]
impl MediaClassifier for RemoteClassifier {
    async fn classify(&self, file: &MediaFile) -> Result<MediaClassification, ProviderError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(&file.media_type())
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let form = Form::new().part(FILE_FIELD, part);

        let url = self.cfg.url();
        debug!(url = %url, filename = %file.filename, bytes = file.len(), "classify request");
        let resp = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.bytes().await.unwrap_or(Bytes::from_static(b""));
            return Err(ProviderError::Remote {
                status: status.as_u16(),
                message: failure_message(&body),
            });
        }

        let parsed: ClassifyMediaResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        parsed.into_classification()
    }
}

/// Server-provided error text, or the generic message when there is none.
fn failure_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["detail", "message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|d| d.as_str()).map(str::to_string))
        })
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn classifier(base_url: String) -> RemoteClassifier {
        RemoteClassifier::new(RemoteConfig {
            base_url,
            endpoint: "/v1/classify-media".to_string(),
            timeout: Duration::from_secs(5),
        })
        .expect("client should build")
    }

    #[tokio::test]
    async fn classify_posts_multipart_and_parses_result() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "filename": "song.mp3",
            "genre": "jazz",
            "confidence": 0.82,
            "top_3_genres": [
                {"genre": "jazz", "confidence": 0.82},
                {"genre": "blues", "confidence": 0.11},
                {"genre": "soul", "confidence": 0.05}
            ],
            "has_audio": true
        });
        Mock::given(method("POST"))
            .and(path("/v1/classify-media"))
            .and(header_regex("content-type", "^multipart/form-data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let result = classifier(server.uri())
            .classify(&MediaFile::new("song.mp3", b"ID3fake".to_vec()))
            .await
            .unwrap();
        assert_eq!(result.genre(), Some("jazz"));
    }

    #[tokio::test]
    async fn non_success_status_carries_server_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/classify-media"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "detail": "Unsupported file type. Please upload an audio or video file."
            })))
            .mount(&server)
            .await;

        let err = classifier(server.uri())
            .classify(&MediaFile::new("notes.txt", b"hi".to_vec()))
            .await
            .unwrap_err();
        match err {
            ProviderError::Remote { status, message } => {
                assert_eq!(status, 400);
                assert!(message.starts_with("Unsupported file type"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_success_without_detail_uses_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = classifier(server.uri())
            .classify(&MediaFile::new("a.wav", vec![1, 2, 3]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), GENERIC_FAILURE);
    }

    #[test]
    fn url_joins_without_double_slash() {
        let cfg = RemoteConfig {
            base_url: "http://localhost:8000/".into(),
            endpoint: "/v1/classify-media".into(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(cfg.url(), "http://localhost:8000/v1/classify-media");
    }
}
