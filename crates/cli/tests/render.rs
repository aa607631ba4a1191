use cli::render::{outcome_json, record_line, selection_json, selection_text, verdict_label};
use genre_core::{ClassificationOutcome, ClassificationRecord, OriginalFile, Selection};
use providers::{Candidate, MediaClassification};

fn blues() -> ClassificationRecord {
    ClassificationRecord::from_classification(
        "take5.wav",
        MediaClassification::Classified {
            genre: "blues".into(),
            confidence: 0.64,
            top_candidates: vec![
                Candidate {
                    label: "blues".into(),
                    confidence: 0.64,
                },
                Candidate {
                    label: "jazz".into(),
                    confidence: 0.3,
                },
            ],
            probabilities: None,
        },
        None,
        12,
    )
}

#[test]
fn labels_genre_and_silence() {
    assert_eq!(verdict_label(&blues()), "BLUES (64%)");
    let silent =
        ClassificationRecord::from_classification("clip.mp4", MediaClassification::NoAudio, None, 1);
    assert_eq!(verdict_label(&silent), "no audio track");
    assert!(record_line(&silent).contains("clip.mp4  no audio track"));
}

#[test]
fn selection_views_report_missing_original() {
    let selection = Selection {
        record: blues(),
        original: OriginalFile::Missing,
    };
    let text = selection_text(&selection);
    assert!(text.contains("genre: blues (64%)"));
    assert!(text.contains("  jazz: 30%"));
    assert!(text.ends_with("original: missing"));

    let value = selection_json(&selection);
    assert_eq!(value["originalAvailable"], false);
    assert!(value["originalBytes"].is_null());
    assert_eq!(value["record"]["filename"], "take5.wav");
}

#[test]
fn outcome_json_status() {
    let hit = ClassificationOutcome::CacheHit(blues());
    assert_eq!(outcome_json(&hit)["status"], "cache_hit");
    let stale = outcome_json(&ClassificationOutcome::Superseded);
    assert_eq!(stale["status"], "superseded");
    assert!(stale["record"].is_null());
}
