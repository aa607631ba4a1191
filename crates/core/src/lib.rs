//! Core library: classification history, media cache and export packaging.

pub mod blobstore;
pub mod classifier;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod metadata_log;
pub mod models;
pub mod pipeline;

pub use classifier::ClassificationOutcome;
pub use error::{ExportError, HistoryError, StorageError};
pub use history::HistoryManager;
pub use models::{ClassificationRecord, OriginalFile, Selection, Verdict};
pub use providers::MediaFile;
