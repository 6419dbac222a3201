//! Export writer ports
//!
//! Writers turn a projected report into bytes. They hold no report logic;
//! the export service decides what goes in.

use crate::domain::result::Result;
use crate::domain::ExportView;

/// Paginated document output (the `pdf` export format)
pub trait DocumentWriter: Send + Sync {
    /// MIME type of the produced bytes
    fn content_type(&self) -> &str;

    /// File extension without the dot
    fn extension(&self) -> &str;

    fn write(&self, view: &ExportView) -> Result<Vec<u8>>;
}

/// Single-sheet workbook output (the `excel` export format)
pub trait SpreadsheetWriter: Send + Sync {
    fn content_type(&self) -> &str;

    fn extension(&self) -> &str;

    fn write(&self, view: &ExportView) -> Result<Vec<u8>>;
}
