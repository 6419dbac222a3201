//! Export adapter - projects a built report and hands it to a writer

use std::sync::Arc;

use crate::clock::Clock;
use crate::domain::result::{Error, Result};
use crate::domain::Report;
use crate::ports::{DocumentWriter, SpreadsheetWriter};

use super::report::ModuleKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Excel,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "excel" => Ok(ExportFormat::Excel),
            _ => Err(Error::UnsupportedFormat(raw.to_string())),
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Excel => "excel",
        }
    }
}

/// Rendered export ready to be streamed or saved
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub struct ExportService {
    document: Arc<dyn DocumentWriter>,
    spreadsheet: Arc<dyn SpreadsheetWriter>,
    clock: Arc<dyn Clock>,
}

impl ExportService {
    pub fn new(
        document: Arc<dyn DocumentWriter>,
        spreadsheet: Arc<dyn SpreadsheetWriter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            document,
            spreadsheet,
            clock,
        }
    }

    /// Project `report` onto `fields` and render it in `format`
    pub fn export(
        &self,
        module: ModuleKey,
        report: &Report,
        format: ExportFormat,
        fields: &[String],
    ) -> Result<ExportFile> {
        let view = report.project(fields);
        let (bytes, content_type, extension) = match format {
            ExportFormat::Pdf => (
                self.document.write(&view)?,
                self.document.content_type(),
                self.document.extension(),
            ),
            ExportFormat::Excel => (
                self.spreadsheet.write(&view)?,
                self.spreadsheet.content_type(),
                self.spreadsheet.extension(),
            ),
        };

        let file_name = format!(
            "{}-report-{}.{}",
            module.key(),
            self.clock.today().format("%Y-%m-%d"),
            extension
        );
        tracing::info!(
            file = %file_name,
            format = format.key(),
            columns = view.columns.len(),
            rows = view.rows.len(),
            bytes = bytes.len(),
            "Exported report"
        );

        Ok(ExportFile {
            file_name,
            content_type: content_type.to_string(),
            bytes,
        })
    }
}
