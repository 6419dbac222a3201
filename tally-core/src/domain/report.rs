//! Tabular module reports and their export projection

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value as JsonValue;

/// Shown for optional fields that have no value.
pub const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub key: String,
    pub label: String,
}

impl Column {
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
        }
    }
}

/// Column key to cell value.
pub type Row = BTreeMap<String, JsonValue>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub title: String,
    pub columns: Vec<Column>,
    pub available_columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl Report {
    /// Narrow the report to `fields`, in the order given.
    ///
    /// Unknown keys are dropped; if nothing usable remains the default
    /// columns are kept.
    pub fn project(&self, fields: &[String]) -> ExportView {
        let mut selected: Vec<Column> = Vec::new();
        for field in fields {
            let known = self.available_columns.iter().find(|c| &c.key == field);
            if let Some(column) = known {
                if !selected.iter().any(|c| c.key == column.key) {
                    selected.push(column.clone());
                }
            }
        }
        if selected.is_empty() {
            selected = self.columns.clone();
        }

        let rows = self
            .rows
            .iter()
            .map(|row| {
                selected
                    .iter()
                    .map(|column| {
                        row.get(&column.key)
                            .cloned()
                            .unwrap_or_else(|| JsonValue::String(PLACEHOLDER.to_string()))
                    })
                    .collect()
            })
            .collect();

        ExportView {
            title: self.title.clone(),
            columns: selected,
            rows,
        }
    }
}

/// Column-projected report handed to the writers; cells align with `columns`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportView {
    pub title: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<JsonValue>>,
}

/// Parse the comma-separated `fields` request parameter.
pub fn parse_fields(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Render a cell as plain text for the writers.
pub fn cell_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => PLACEHOLDER.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f:.2}"),
            _ => n.to_string(),
        },
        JsonValue::Bool(b) => b.to_string(),
        _ => value.to_string(),
    }
}
