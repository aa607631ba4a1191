//! Terminal and JSON views of history records.

use genre_core::export::percent;
use genre_core::{ClassificationOutcome, ClassificationRecord, Selection, Verdict};
use serde_json::{json, Value};

/// `JAZZ (82%)`, or `no audio track` for silent media.
pub fn verdict_label(record: &ClassificationRecord) -> String {
    match record.verdict() {
        Verdict::Genre {
            genre, confidence, ..
        } => format!("{} ({}%)", genre.to_uppercase(), percent(confidence)),
        Verdict::NoAudio => "no audio track".to_string(),
    }
}

/// One history row: id, timestamp, filename and verdict.
pub fn record_line(record: &ClassificationRecord) -> String {
    format!(
        "{}  {}  {}  {}",
        record.id,
        record.created_at.format("%Y-%m-%d %H:%M:%S"),
        record.filename,
        verdict_label(record)
    )
}

pub fn outcome_line(outcome: &ClassificationOutcome) -> String {
    match outcome {
        ClassificationOutcome::Recorded(r) => format!("recorded {}", record_line(r)),
        ClassificationOutcome::CacheHit(r) => format!("already in history {}", record_line(r)),
        ClassificationOutcome::Superseded => "superseded by a newer request".to_string(),
    }
}

pub fn outcome_json(outcome: &ClassificationOutcome) -> Value {
    let status = match outcome {
        ClassificationOutcome::Recorded(_) => "recorded",
        ClassificationOutcome::CacheHit(_) => "cache_hit",
        ClassificationOutcome::Superseded => "superseded",
    };
    json!({ "status": status, "record": outcome.record() })
}

/// Multi-line detail view of a selected record.
pub fn selection_text(selection: &Selection) -> String {
    let record = &selection.record;
    let mut lines = vec![
        format!("id: {}", record.id),
        format!("file: {}", record.filename),
        format!("analyzed: {}", record.created_at.format("%Y-%m-%d %H:%M:%S UTC")),
    ];
    match record.verdict() {
        Verdict::Genre {
            genre,
            confidence,
            top_candidates,
        } => {
            lines.push(format!("genre: {} ({}%)", genre, percent(confidence)));
            for c in top_candidates {
                lines.push(format!("  {}: {}%", c.label, percent(c.confidence)));
            }
        }
        Verdict::NoAudio => lines.push("genre: none (no audio track)".to_string()),
    }
    match selection.original.bytes() {
        Some(bytes) => lines.push(format!("original: {} bytes", bytes.len())),
        None => lines.push("original: missing".to_string()),
    }
    lines.join("\n")
}

pub fn selection_json(selection: &Selection) -> Value {
    json!({
        "record": selection.record,
        "originalAvailable": !selection.original.is_missing(),
        "originalBytes": selection.original.bytes().map(|b| b.len()),
    })
}
