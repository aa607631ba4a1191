//! Metadata export and bundle packaging. Both are read-only over history.

use crate::error::ExportError;
use crate::history::HistoryManager;
use crate::models::{ClassificationRecord, OriginalFile};
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const SUMMARY_FILE: &str = "SUMMARY_REPORT.txt";
pub const RECORD_FILE: &str = "analysis_data.json";

/// Pretty-printed JSON array of the current history, or `None` when empty.
pub async fn export_metadata(history: &HistoryManager) -> Result<Option<String>, ExportError> {
    let records = history.records().await;
    if records.is_empty() {
        return Ok(None);
    }
    let doc = serde_json::to_string_pretty(&records)?;
    info!(records = records.len(), "metadata exported");
    Ok(Some(doc))
}

/// Zip archive with one folder per record plus a text summary, or `None` when empty.
pub async fn export_bundle(history: &HistoryManager) -> Result<Option<Vec<u8>>, ExportError> {
    let records = history.records().await;
    if records.is_empty() {
        return Ok(None);
    }

    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut summary = String::from("AI MEDIA ANALYSIS BUNDLE REPORT\n");
    summary.push_str("================================\n\n");

    let mut packaged = 0usize;
    for (index, record) in records.iter().enumerate() {
        let original = history.original_file(&record.id).await?;
        if let OriginalFile::Available(bytes) = &original {
            let folder = format!("Analysis_{}", index + 1);
            zip.start_file(format!("{}/{}", folder, media_entry_name(record)), options)?;
            zip.write_all(bytes)?;
            zip.start_file(format!("{}/{}", folder, RECORD_FILE), options)?;
            zip.write_all(serde_json::to_string_pretty(record)?.as_bytes())?;
            packaged += 1;
        } else {
            debug!(id = %record.id, "original missing, not packaged");
        }
        write_summary_entry(&mut summary, record, original.is_missing());
    }

    zip.start_file(SUMMARY_FILE, options)?;
    zip.write_all(summary.as_bytes())?;
    let bytes = zip.finish()?.into_inner();
    info!(records = records.len(), packaged, bytes = bytes.len(), "bundle generated");
    Ok(Some(bytes))
}

fn genre_label(record: &ClassificationRecord) -> String {
    record
        .genre
        .as_deref()
        .unwrap_or("Unknown")
        .to_uppercase()
}

/// `<GENRE> - <filename>` with path separators neutralised.
fn media_entry_name(record: &ClassificationRecord) -> String {
    let safe: String = record
        .filename
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{} - {}", genre_label(record), safe)
}

/// Confidence in whole percent, rounded.
pub fn percent(value: f32) -> i64 {
    (value as f64 * 100.0).round() as i64
}

fn write_summary_entry(out: &mut String, record: &ClassificationRecord, missing: bool) {
    let _ = writeln!(out, "File: {}", record.filename);
    let _ = writeln!(out, "Classified Genre: {}", genre_label(record));
    if record.is_no_audio() {
        let _ = writeln!(out, "Confidence: n/a (no audio track)");
    } else {
        let _ = writeln!(out, "Confidence: {}%", percent(record.confidence));
    }
    if let Some(probabilities) = &record.probabilities {
        let _ = writeln!(out, "PROBABILITY BREAKDOWN:");
        for (label, score) in probabilities {
            let _ = writeln!(out, "  - {}: {}%", label, percent(*score));
        }
    }
    if missing {
        let _ = writeln!(out, "Original File: missing (not included)");
    }
    let _ = writeln!(
        out,
        "Analyzed On: {}",
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    out.push_str("--------------------------------\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::MediaClassification;

    #[test]
    fn entry_name_uppercases_genre_and_strips_separators() {
        let mut rec = ClassificationRecord::from_classification(
            "dir/a.mp3",
            MediaClassification::NoAudio,
            None,
            0,
        );
        assert_eq!(media_entry_name(&rec), "UNKNOWN - dir_a.mp3");
        rec.genre = Some("hiphop".into());
        assert_eq!(media_entry_name(&rec), "HIPHOP - dir_a.mp3");
    }

    #[test]
    fn percent_rounds() {
        assert_eq!(percent(0.824), 82);
        assert_eq!(percent(0.826), 83);
        assert_eq!(percent(0.0), 0);
    }
}
