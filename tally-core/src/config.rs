//! Configuration management
//!
//! Settings live in `<dir>/settings.json`:
//! ```json
//! {
//!   "reports": { "failurePolicy": "abort", "rowLimit": 500, "rowsPerPage": 40 },
//!   "database": { "file": "tally.duckdb" }
//! }
//! ```
//! Keys this crate does not manage are kept when saving.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::FailurePolicy;

pub const DEFAULT_ROW_LIMIT: usize = 500;
pub const DEFAULT_ROWS_PER_PAGE: usize = 40;
pub const DEFAULT_DATABASE_FILE: &str = "tally.duckdb";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    reports: ReportSettings,
    #[serde(default)]
    database: DatabaseSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure_policy: Option<FailurePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    row_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rows_per_page: Option<usize>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Tally configuration (resolved view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub failure_policy: FailurePolicy,
    /// Ceiling on rows returned by a module report
    pub row_limit: usize,
    /// Table rows per page in document exports
    pub rows_per_page: usize,
    pub database_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            row_limit: DEFAULT_ROW_LIMIT,
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
            database_file: DEFAULT_DATABASE_FILE.to_string(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// `TALLY_FAILURE_POLICY` and `TALLY_ROW_LIMIT` override the file.
    pub fn load(dir: &Path) -> Result<Self> {
        let raw = read_settings(dir)?;
        let defaults = Self::default();

        let failure_policy = match std::env::var("TALLY_FAILURE_POLICY").ok() {
            Some(value) => FailurePolicy::parse(&value)
                .with_context(|| format!("TALLY_FAILURE_POLICY must be abort or isolate, got '{value}'"))?,
            None => raw.reports.failure_policy.unwrap_or(defaults.failure_policy),
        };

        let row_limit = match std::env::var("TALLY_ROW_LIMIT").ok() {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .with_context(|| format!("TALLY_ROW_LIMIT must be a positive integer, got '{value}'"))?,
            None => raw.reports.row_limit.unwrap_or(defaults.row_limit),
        };

        Ok(Self {
            failure_policy,
            row_limit: row_limit.max(1),
            rows_per_page: raw.reports.rows_per_page.unwrap_or(defaults.rows_per_page).max(1),
            database_file: raw.database.file.unwrap_or(defaults.database_file),
        })
    }

    /// Save config to the data directory
    /// Preserves other settings this crate doesn't manage
    pub fn save(&self, dir: &Path) -> Result<()> {
        let mut settings = read_settings(dir)?;

        settings.reports.failure_policy = Some(self.failure_policy);
        settings.reports.row_limit = Some(self.row_limit);
        settings.reports.rows_per_page = Some(self.rows_per_page);
        settings.database.file = Some(self.database_file.clone());

        std::fs::create_dir_all(dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(dir.join("settings.json"), content)?;
        Ok(())
    }
}

fn read_settings(dir: &Path) -> Result<SettingsFile> {
    let settings_path = dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid settings file {}", settings_path.display()))
}
