//! Wizard Configuration Parser
//!
//! Parses wizard.toml files holding the option lists the import wizard
//! offers (delimiters, encodings, bindable columns) and the UI locale.

use crate::import::{file_encoding, ImportColumn};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration shipped with the binary
const DEFAULT_CONFIG: &str = include_str!("../resources/wizard.toml");

/// The main configuration structure matching wizard.toml
#[derive(Debug, Clone, Deserialize)]
pub struct WizardConfig {
    #[serde(default)]
    pub wizard: GeneralConfig,
    pub import: ImportConfig,
}

/// General wizard settings
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Locale used for string lookups (e.g. "en", "uk")
    #[serde(default = "default_locale")]
    pub locale: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
        }
    }
}

/// Options offered by the import step
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Delimiter choices, first one preselected
    pub csv_delimiters: Vec<String>,

    /// Encoding choices, first one preselected
    pub file_encodings: Vec<String>,

    /// Rows shown in the preview table
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Bindable fields in the order they are offered
    pub columns: Vec<ColumnOption>,
}

/// One bindable field and its label (raw text or `%key`)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnOption {
    pub kind: ImportColumn,
    pub label: String,
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_preview_rows() -> usize {
    20
}

impl WizardConfig {
    /// Load configuration from a file path
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("Failed to parse wizard.toml")
    }

    /// The configuration embedded in the binary
    pub fn embedded() -> Result<Self> {
        Self::from_str(DEFAULT_CONFIG)
    }

    /// Explicit path if given, else the user's config dir, else the embedded default
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match user_config_path().filter(|p| p.exists()) {
                Some(path) => {
                    tracing::info!("Using configuration {}", path.display());
                    Self::from_file(&path)?
                }
                None => Self::embedded()?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.import.csv_delimiters.is_empty() {
            anyhow::bail!("[import] csv_delimiters must list at least one delimiter");
        }

        if self.import.file_encodings.is_empty() {
            anyhow::bail!("[import] file_encodings must list at least one encoding");
        }

        for label in &self.import.file_encodings {
            file_encoding(label).context("[import] file_encodings")?;
        }

        if self.import.preview_rows == 0 {
            anyhow::bail!("[import] preview_rows must be greater than zero");
        }

        match self.import.columns.first() {
            Some(first) if first.kind == ImportColumn::Unused => {}
            _ => anyhow::bail!("[[import.columns]] must start with the 'unused' column"),
        }

        Ok(())
    }
}

/// `<config dir>/progressive/wizard.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("progressive").join("wizard.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [import]
            csv_delimiters = [";"]
            file_encodings = ["UTF-8"]

            [[import.columns]]
            kind = "unused"
            label = "-"

            [[import.columns]]
            kind = "summary"
            label = "Summary"
        "#;

        let config = WizardConfig::from_str(toml).unwrap();
        assert_eq!(config.wizard.locale, "en"); // default
        assert_eq!(config.import.preview_rows, 20); // default
        assert_eq!(config.import.columns.len(), 2);
        config.validate().unwrap();
    }

    #[test]
    fn test_columns_keep_declared_order() {
        let toml = r#"
            [wizard]
            locale = "uk"

            [import]
            csv_delimiters = [",", ";"]
            file_encodings = ["UTF-8"]
            preview_rows = 5

            [[import.columns]]
            kind = "unused"
            label = "%col_unused"

            [[import.columns]]
            kind = "status"
            label = "%col_status"

            [[import.columns]]
            kind = "key"
            label = "%col_key"
        "#;

        let config = WizardConfig::from_str(toml).unwrap();
        let kinds: Vec<ImportColumn> = config.import.columns.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ImportColumn::Unused, ImportColumn::Status, ImportColumn::Key]
        );
        assert_eq!(config.wizard.locale, "uk");
        assert_eq!(config.import.preview_rows, 5);
        config.validate().unwrap();
    }

    #[test]
    fn test_embedded_config_is_valid() {
        let config = WizardConfig::embedded().unwrap();
        config.validate().unwrap();
        assert!(!config.import.csv_delimiters.is_empty());
        assert_eq!(config.import.file_encodings[0], "UTF-8");
    }

    #[test]
    fn test_validate_rejects_empty_lists() {
        let toml = r#"
            [import]
            csv_delimiters = []
            file_encodings = ["UTF-8"]

            [[import.columns]]
            kind = "unused"
            label = "-"
        "#;

        let config = WizardConfig::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_encoding() {
        let toml = r#"
            [import]
            csv_delimiters = [","]
            file_encodings = ["UTF-8", "klingon-8"]

            [[import.columns]]
            kind = "unused"
            label = "-"
        "#;

        let config = WizardConfig::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("klingon-8"));
    }

    #[test]
    fn test_validate_requires_unused_first() {
        let toml = r#"
            [import]
            csv_delimiters = [","]
            file_encodings = ["UTF-8"]

            [[import.columns]]
            kind = "summary"
            label = "Summary"
        "#;

        let config = WizardConfig::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_column_is_a_parse_error() {
        let toml = r#"
            [import]
            csv_delimiters = [","]
            file_encodings = ["UTF-8"]

            [[import.columns]]
            kind = "velocity"
            label = "Velocity"
        "#;

        assert!(WizardConfig::from_str(toml).is_err());
    }
}
