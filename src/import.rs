//! CSV Import - Preview and commit operations used by the import step
//!
//! Both operations read the file synchronously and may be slow; the wizard
//! always calls them through the task bridge, never on the UI thread.
//! Files are decoded with `encoding_rs` and parsed with the `csv` reader, so
//! quoted fields may span lines.

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Field a source column can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportColumn {
    /// Column is ignored
    Unused,
    Key,
    Summary,
    Assignee,
    Estimate,
    Status,
}

impl ImportColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportColumn::Unused => "unused",
            ImportColumn::Key => "key",
            ImportColumn::Summary => "summary",
            ImportColumn::Assignee => "assignee",
            ImportColumn::Estimate => "estimate",
            ImportColumn::Status => "status",
        }
    }
}

/// Field -> zero-based source column index
pub type ColumnBindings = BTreeMap<ImportColumn, usize>;

/// How to read the source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadConfig {
    pub file: PathBuf,
    pub delimiter: String,
    pub encoding: String,
    /// Maximum number of rows returned by a preview
    pub preview_rows: usize,
}

/// First rows of a file, for the user to bind columns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewResult {
    /// Width of the widest row
    pub columns: usize,
    pub rows: Vec<Vec<String>>,
}

/// Outcome of a committed import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub source: PathBuf,
    pub output: PathBuf,
    pub records: usize,
}

/// Data operations the import step needs from the host application
pub trait ImportEngine: Send + Sync {
    fn compute_preview(&self, config: &ReadConfig) -> Result<PreviewResult>;
    fn commit_import(&self, config: &ReadConfig, bindings: &ColumnBindings) -> Result<ImportSummary>;
}

/// Reads delimited text files and writes bound records as JSON
#[derive(Debug, Default, Clone)]
pub struct CsvImportEngine;

impl CsvImportEngine {
    fn read_rows(&self, config: &ReadConfig, limit: Option<usize>) -> Result<Vec<Vec<String>>> {
        let encoding = file_encoding(&config.encoding)?;
        let delimiter = parse_delimiter(&config.delimiter)?;

        let bytes = std::fs::read(&config.file)
            .with_context(|| format!("Failed to read {}", config.file.display()))?;
        let (text, _, malformed) = encoding.decode(&bytes);
        if malformed {
            tracing::warn!(
                "{} is not valid {}; bad bytes were replaced",
                config.file.display(),
                encoding.name()
            );
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        reader
            .records()
            .take(limit.unwrap_or(usize::MAX))
            .map(|record| -> Result<Vec<String>> {
                let record = record
                    .with_context(|| format!("Malformed CSV in {}", config.file.display()))?;
                Ok(record.iter().map(str::to_string).collect())
            })
            .collect()
    }
}

impl ImportEngine for CsvImportEngine {
    fn compute_preview(&self, config: &ReadConfig) -> Result<PreviewResult> {
        let rows = self.read_rows(config, Some(config.preview_rows))?;
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);

        tracing::debug!(
            "Preview of {}: {} rows, {} columns",
            config.file.display(),
            rows.len(),
            columns
        );

        Ok(PreviewResult { columns, rows })
    }

    fn commit_import(&self, config: &ReadConfig, bindings: &ColumnBindings) -> Result<ImportSummary> {
        let bound: Vec<(ImportColumn, usize)> = bindings
            .iter()
            .filter(|(column, _)| **column != ImportColumn::Unused)
            .map(|(column, index)| (*column, *index))
            .collect();

        if bound.is_empty() {
            anyhow::bail!("No columns are bound to import fields");
        }

        let rows = self.read_rows(config, None)?;
        let records: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| {
                let record: serde_json::Map<String, serde_json::Value> = bound
                    .iter()
                    .map(|(column, index)| {
                        let cell = row.get(*index).cloned().unwrap_or_default();
                        (column.as_str().to_string(), serde_json::Value::String(cell))
                    })
                    .collect();
                serde_json::Value::Object(record)
            })
            .collect();

        let output = output_path(&config.file);
        let json = serde_json::to_string_pretty(&records)?;
        std::fs::write(&output, json)
            .with_context(|| format!("Failed to write {}", output.display()))?;

        tracing::info!("Imported {} records into {}", records.len(), output.display());

        Ok(ImportSummary {
            source: config.file.clone(),
            output,
            records: records.len(),
        })
    }
}

/// `sprint.csv` -> `sprint.import.json`
pub fn output_path(source: &Path) -> PathBuf {
    source.with_extension("import.json")
}

/// Look up an encoding by its WHATWG label ("UTF-8", "windows-1251", ...)
pub fn file_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .with_context(|| format!("Unsupported file encoding: {}", label))
}

fn parse_delimiter(raw: &str) -> Result<u8> {
    match raw {
        "\\t" | "TAB" | "tab" => Ok(b'\t'),
        _ => match raw.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => anyhow::bail!("Delimiter must be a single ASCII character, got {:?}", raw),
        },
    }
}
