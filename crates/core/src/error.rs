//! Error taxonomy for the history subsystem.

use providers::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage full: {requested} bytes requested, {available} available")]
    StorageFull { requested: u64, available: u64 },
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        // SQLITE_FULL (13): database or disk is full.
        let full = err
            .as_database_error()
            .and_then(|d| d.code())
            .map(|code| code == "13")
            .unwrap_or(false);
        if full {
            StorageError::StorageFull {
                requested: 0,
                available: 0,
            }
        } else {
            StorageError::StorageUnavailable(err.to_string())
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::StorageUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::StorageUnavailable(format!("metadata encoding: {}", err))
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    /// Classification call failed; history is untouched.
    #[error("{0}")]
    Remote(#[from] ProviderError),
    /// A store write failed; partial writes were rolled back.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("unknown record: {0}")]
    UnknownRecord(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("archive generation failed: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type HistoryResult<T> = Result<T, HistoryError>;
