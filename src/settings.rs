use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::assembler::{AssembleOptions, RowOrder};
use crate::classifier::Labels;
use crate::error::{PaysheetError, Result};
use crate::export::ExportFormat;
use crate::normalizer::ColumnBinding;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub binding: ColumnBinding,
    pub row_order: RowOrder,
    pub include_reconciliation: bool,
    pub totals: bool,
    pub export_format: ExportFormat,
    /// Directory for exports when no output path is given (default: cwd).
    pub output_dir: Option<String>,
    pub labels: Labels,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            binding: ColumnBinding::ByName,
            row_order: RowOrder::Insertion,
            include_reconciliation: true,
            totals: true,
            export_format: ExportFormat::default(),
            output_dir: None,
            labels: Labels::default(),
        }
    }
}

impl Settings {
    pub fn assemble_options(&self) -> AssembleOptions {
        AssembleOptions {
            row_order: self.row_order,
            include_reconciliation: self.include_reconciliation,
            totals: self.totals,
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .as_deref()
            .map(|d| PathBuf::from(shellexpand_path(d)))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("paysheet")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Load settings from `path`, or from the default location when `None`.
/// A missing default file yields defaults; a missing explicit file is an error.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (settings_path(), false),
    };
    if !path.exists() {
        if explicit {
            return Err(PaysheetError::Settings(format!(
                "settings file not found: {}",
                path.display()
            )));
        }
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(&path)?;
    serde_json::from_str(&content)
        .map_err(|e| PaysheetError::Settings(format!("{}: {e}", path.display())))
}

pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| PaysheetError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{LabelRule, MatchType};

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            binding: ColumnBinding::ByPosition,
            row_order: RowOrder::Sorted,
            output_dir: Some("/tmp/out".to_string()),
            ..Settings::default()
        };
        save_settings(&settings, &path).unwrap();
        let loaded = load_settings(Some(&path)).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.binding, ColumnBinding::ByName);
        assert_eq!(s.row_order, RowOrder::Insertion);
        assert!(s.include_reconciliation);
        assert_eq!(s.output_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{
            "binding": "by_position",
            "labels": {"tax": [{"pattern": "^IR", "match_type": "regex"}]}
        }"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.binding, ColumnBinding::ByPosition);
        assert_eq!(s.row_order, RowOrder::Insertion);
        assert_eq!(
            s.labels.tax,
            vec![LabelRule { pattern: "^IR".into(), match_type: MatchType::Regex }]
        );
        assert_eq!(s.labels.pension, Labels::default().pension);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_settings(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, PaysheetError::Settings(_)));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_settings(Some(&path)).is_err());
    }

    #[test]
    fn test_shellexpand_path() {
        assert_eq!(shellexpand_path("/abs/dir"), "/abs/dir");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(shellexpand_path("~/out"), format!("{}/out", home.to_string_lossy()));
        }
    }
}
