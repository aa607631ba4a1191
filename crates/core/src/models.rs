use chrono::{DateTime, Utc};
use providers::MediaClassification;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use providers::Candidate;

/// One classification result plus its provenance.
///
/// Field order is the serialized order used by metadata exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRecord {
    pub id: String,
    pub filename: String,
    pub genre: Option<String>,
    pub confidence: f32,
    #[serde(default)]
    pub top_candidates: Vec<Candidate>,
    pub has_audio: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<BTreeMap<String, f32>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default)]
    pub size_bytes: u64,
}

/// Structured view of what a record says about its media.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<'a> {
    Genre {
        genre: &'a str,
        confidence: f32,
        top_candidates: &'a [Candidate],
    },
    NoAudio,
}

impl ClassificationRecord {
    /// Build a fresh record with a new id for a successful classification.
    pub fn from_classification(
        filename: impl Into<String>,
        classification: MediaClassification,
        content_hash: Option<String>,
        size_bytes: u64,
    ) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let filename = filename.into();
        let created_at = Utc::now();
        match classification {
            MediaClassification::Classified {
                genre,
                confidence,
                top_candidates,
                probabilities,
            } => Self {
                id,
                filename,
                genre: Some(genre),
                confidence,
                top_candidates,
                has_audio: true,
                probabilities,
                created_at,
                content_hash,
                size_bytes,
            },
            MediaClassification::NoAudio => Self {
                id,
                filename,
                genre: None,
                confidence: 0.0,
                top_candidates: Vec::new(),
                has_audio: false,
                probabilities: None,
                created_at,
                content_hash,
                size_bytes,
            },
        }
    }

    pub fn verdict(&self) -> Verdict<'_> {
        match (self.has_audio, self.genre.as_deref()) {
            (true, Some(genre)) => Verdict::Genre {
                genre,
                confidence: self.confidence,
                top_candidates: &self.top_candidates,
            },
            _ => Verdict::NoAudio,
        }
    }

    pub fn is_no_audio(&self) -> bool {
        matches!(self.verdict(), Verdict::NoAudio)
    }

    /// Dedup key: filename plus resulting genre.
    pub fn matches_outcome(&self, filename: &str, genre: Option<&str>) -> bool {
        self.filename == filename && self.genre.as_deref() == genre
    }

    /// Same filename and identical uploaded bytes.
    pub fn matches_content(&self, filename: &str, content_hash: &str) -> bool {
        self.filename == filename && self.content_hash.as_deref() == Some(content_hash)
    }
}

/// Original upload as found in the blob store.
#[derive(Debug, Clone, PartialEq)]
pub enum OriginalFile {
    Available(Vec<u8>),
    /// The blob was evicted or cleared independently of the metadata.
    Missing,
}

impl OriginalFile {
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            OriginalFile::Available(b) => Some(b),
            OriginalFile::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, OriginalFile::Missing)
    }
}

impl From<Option<Vec<u8>>> for OriginalFile {
    fn from(value: Option<Vec<u8>>) -> Self {
        value.map(OriginalFile::Available).unwrap_or(OriginalFile::Missing)
    }
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub record: ClassificationRecord,
    pub original: OriginalFile,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jazz() -> MediaClassification {
        MediaClassification::Classified {
            genre: "jazz".into(),
            confidence: 0.82,
            top_candidates: vec![
                Candidate {
                    label: "jazz".into(),
                    confidence: 0.82,
                },
                Candidate {
                    label: "blues".into(),
                    confidence: 0.11,
                },
            ],
            probabilities: None,
        }
    }

    #[test]
    fn no_audio_record_has_void_fields() {
        let rec = ClassificationRecord::from_classification(
            "clip.mp4",
            MediaClassification::NoAudio,
            None,
            10,
        );
        assert!(rec.genre.is_none());
        assert!(rec.top_candidates.is_empty());
        assert_eq!(rec.verdict(), Verdict::NoAudio);
    }

    #[test]
    fn records_get_distinct_ids() {
        let a = ClassificationRecord::from_classification("a.mp3", jazz(), None, 1);
        let b = ClassificationRecord::from_classification("a.mp3", jazz(), None, 1);
        assert_ne!(a.id, b.id);
        assert!(a.matches_outcome("a.mp3", Some("jazz")));
        assert!(!a.matches_outcome("a.mp3", Some("rock")));
    }

    #[test]
    fn serializes_camel_case_in_stable_order() {
        let rec = ClassificationRecord::from_classification("a.mp3", jazz(), Some("h".into()), 5);
        let json = serde_json::to_string(&rec).unwrap();
        let id_pos = json.find("\"id\"").unwrap();
        let filename_pos = json.find("\"filename\"").unwrap();
        let created_pos = json.find("\"createdAt\"").unwrap();
        assert!(id_pos < filename_pos && filename_pos < created_pos);
        assert!(json.contains("\"topCandidates\""));
        assert!(json.contains("\"hasAudio\":true"));
        let back: ClassificationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }
}
