use crate::metadata_log::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub history: HistoryConfig,
    pub storage: StorageConfig,
    pub classifier: ClassifierConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// "sqlite" or "memory".
    pub backend: String,
    pub database: String,
    pub metadata_path: String,
    pub max_blob_bytes: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            database: "data/media_cache.db".to_string(),
            metadata_path: "data/genre_history.json".to_string(),
            max_blob_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// "remote" or "noop".
    pub provider: String,
    pub base_url: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: "remote".to_string(),
            base_url: "http://localhost:8000".to_string(),
            endpoint: "/v1/classify-media".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: ".".to_string(),
        }
    }
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    let cfg = settings.build()?;
    let mut app: AppConfig = cfg.try_deserialize()?;
    if let Ok(base) = std::env::var("CLASSIFIER_BASE_URL") {
        if !base.trim().is_empty() {
            app.classifier.base_url = base;
        }
    }
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("app.toml");
        std::fs::write(
            &path,
            "[history]\ncapacity = 4\n\n[storage]\nmax_blob_bytes = 2048\n",
        )
        .unwrap();
        let cfg = load(Some(&path.to_string_lossy())).unwrap();
        assert_eq!(cfg.history.capacity, 4);
        assert_eq!(cfg.storage.max_blob_bytes, Some(2048));
        assert_eq!(cfg.storage.backend, "sqlite");
        assert_eq!(cfg.classifier.endpoint, "/v1/classify-media");
    }
}
