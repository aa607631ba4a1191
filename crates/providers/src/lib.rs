//! Provider abstractions for remote media classification.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;

pub mod noop;
pub mod remote;

/// Message used when a failed response carries no usable detail.
pub const GENERIC_FAILURE: &str = "Classification failed.";

/// Maximum number of ranked candidates kept from a response.
pub const MAX_CANDIDATES: usize = 3;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("not implemented")]
    NotImplemented,
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("{message}")]
    Remote { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

/// One uploaded media file.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Explicit content type, or one guessed from the file extension.
    pub fn media_type(&self) -> String {
        self.content_type
            .clone()
            .unwrap_or_else(|| guess_media_type(&self.filename).to_string())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub fn guess_media_type(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" | "oga" => "audio/ogg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "opus" => "audio/opus",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(alias = "genre")]
    pub label: String,
    pub confidence: f32,
}

/// Structured result of a successful classification call.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaClassification {
    Classified {
        genre: String,
        confidence: f32,
        top_candidates: Vec<Candidate>,
        probabilities: Option<BTreeMap<String, f32>>,
    },
    NoAudio,
}

impl MediaClassification {
    pub fn genre(&self) -> Option<&str> {
        match self {
            MediaClassification::Classified { genre, .. } => Some(genre),
            MediaClassification::NoAudio => None,
        }
    }
}

/// Response body of the classification endpoint.
///
/// Accepts both the camelCase contract and the snake_case form the server emits.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyMediaResponse {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, alias = "has_audio", rename = "hasAudio")]
    pub has_audio: bool,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default, alias = "top_3_genres", rename = "topCandidates")]
    pub top_candidates: Vec<Candidate>,
    #[serde(default)]
    pub probabilities: Option<BTreeMap<String, f32>>,
}

impl ClassifyMediaResponse {
    pub fn into_classification(self) -> Result<MediaClassification, ProviderError> {
        if !self.has_audio {
            return Ok(MediaClassification::NoAudio);
        }
        let genre = self
            .genre
            .filter(|g| !g.trim().is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("audio present but no genre".into()))?;
        let mut top_candidates = self.top_candidates;
        top_candidates.truncate(MAX_CANDIDATES);
        let confidence = self
            .confidence
            .or_else(|| {
                top_candidates
                    .iter()
                    .find(|c| c.label == genre)
                    .map(|c| c.confidence)
            })
            .unwrap_or(0.0)
            .clamp(0.0, 1.0);
        for c in top_candidates.iter_mut() {
            c.confidence = c.confidence.clamp(0.0, 1.0);
        }
        Ok(MediaClassification::Classified {
            genre,
            confidence,
            top_candidates,
            probabilities: self.probabilities,
        })
    }
}

#[async_trait::async_trait]
pub trait MediaClassifier: Send + Sync {
    async fn classify(&self, file: &MediaFile) -> Result<MediaClassification, ProviderError>;
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    classifiers: HashMap<String, Arc<dyn MediaClassifier>>,
    pub preferred_classifier: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classifier(mut self, name: &str, provider: Arc<dyn MediaClassifier>) -> Self {
        self.classifiers.insert(name.to_string(), provider);
        self
    }

    pub fn set_preferred_classifier(mut self, name: &str) -> Self {
        self.preferred_classifier = Some(name.to_string());
        self
    }

    pub fn classifier(
        &self,
        name: Option<&str>,
    ) -> Result<Arc<dyn MediaClassifier>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred_classifier.clone())
            .ok_or_else(|| ProviderError::UnknownProvider("no classifier configured".into()))?;
        self.classifiers
            .get(&key)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_contract() {
        let body = r#"{
            "filename": "song.mp3",
            "hasAudio": true,
            "genre": "jazz",
            "confidence": 0.82,
            "topCandidates": [
                {"label": "jazz", "confidence": 0.82},
                {"label": "blues", "confidence": 0.11},
                {"label": "soul", "confidence": 0.05}
            ]
        }"#;
        let resp: ClassifyMediaResponse = serde_json::from_str(body).unwrap();
        match resp.into_classification().unwrap() {
            MediaClassification::Classified {
                genre,
                confidence,
                top_candidates,
                probabilities,
            } => {
                assert_eq!(genre, "jazz");
                assert!((confidence - 0.82).abs() < 1e-6);
                assert_eq!(top_candidates.len(), 3);
                assert_eq!(top_candidates[1].label, "blues");
                assert!(probabilities.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_server_snake_case_form() {
        let body = r#"{
            "filename": "a.wav",
            "genre": "rock",
            "confidence": 0.6,
            "top_3_genres": [
                {"genre": "rock", "confidence": 0.6},
                {"genre": "metal", "confidence": 0.2},
                {"genre": "pop", "confidence": 0.1},
                {"genre": "jazz", "confidence": 0.05}
            ],
            "has_audio": true
        }"#;
        let resp: ClassifyMediaResponse = serde_json::from_str(body).unwrap();
        let classification = resp.into_classification().unwrap();
        assert_eq!(classification.genre(), Some("rock"));
        if let MediaClassification::Classified { top_candidates, .. } = classification {
            assert_eq!(top_candidates.len(), MAX_CANDIDATES);
            assert_eq!(top_candidates[0].label, "rock");
        }
    }

    #[test]
    fn missing_audio_is_no_audio_even_with_stray_fields() {
        let body = r#"{"filename": "clip.mp4", "hasAudio": false, "genre": null, "confidence": 0}"#;
        let resp: ClassifyMediaResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            resp.into_classification().unwrap(),
            MediaClassification::NoAudio
        );
    }

    #[test]
    fn audio_without_genre_is_invalid() {
        let body = r#"{"hasAudio": true}"#;
        let resp: ClassifyMediaResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            resp.into_classification(),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn media_type_guess_uses_extension() {
        assert_eq!(guess_media_type("Song.MP3"), "audio/mpeg");
        assert_eq!(guess_media_type("clip.mp4"), "video/mp4");
        assert_eq!(guess_media_type("notes"), "application/octet-stream");
        let file = MediaFile::new("x.bin", vec![]).with_content_type("audio/wav");
        assert_eq!(file.media_type(), "audio/wav");
    }

    #[test]
    fn registry_resolves_preferred() {
        let reg = ProviderRegistry::new()
            .with_classifier("noop", Arc::new(noop::NoopClassifier))
            .set_preferred_classifier("noop");
        assert!(reg.classifier(None).is_ok());
        assert!(matches!(
            reg.classifier(Some("missing")),
            Err(ProviderError::UnknownProvider(_))
        ));
    }
}
