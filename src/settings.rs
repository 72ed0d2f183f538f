use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::direction::FallbackDirection;
use crate::error::{PennyError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    /// How many times each image/PDF is run through OCR to check consistency.
    #[serde(default = "default_ocr_passes")]
    pub ocr_passes: usize,
    #[serde(default)]
    pub fallback_direction: FallbackDirection,
    /// Replaces the built-in debit vocabulary when non-empty.
    #[serde(default)]
    pub debit_keywords: BTreeMap<String, u32>,
    /// Replaces the built-in credit vocabulary when non-empty.
    #[serde(default)]
    pub credit_keywords: BTreeMap<String, u32>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_ocr_passes() -> usize {
    1
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            ocr_passes: default_ocr_passes(),
            fallback_direction: FallbackDirection::default(),
            debit_keywords: BTreeMap::new(),
            credit_keywords: BTreeMap::new(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_path().join("penny.db")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_path().join("uploads")
    }

    pub fn statements_dir(&self) -> PathBuf {
        self.data_path().join("statements")
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("penny")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("penny")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| PennyError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.ocr_passes, 1);
        assert_eq!(s.fallback_direction, FallbackDirection::Debit);
        assert!(s.debit_keywords.is_empty());
        assert_eq!(s.log_level, "warn");
        assert!(s.db_path().ends_with("penny.db"));
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/penny", "fallback_direction": "credit"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.data_dir, "/tmp/penny");
        assert_eq!(s.fallback_direction, FallbackDirection::Credit);
        assert_eq!(s.ocr_passes, 1);
        assert_eq!(s.statements_dir(), PathBuf::from("/tmp/penny/statements"));
    }

    #[test]
    fn test_keyword_tables_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = Settings::default();
        settings.debit_keywords.insert("tuition".to_string(), 3);
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let loaded: Settings =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.debit_keywords.get("tuition"), Some(&3));
    }
}
