//! Paginated text document writer
//!
//! Renders the export view as fixed-width tables, `rows_per_page` rows
//! each. Pages are separated by a form feed and open with the title and a
//! "Page n of m" line.

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use serde_json::Value as JsonValue;

use crate::domain::report::cell_text;
use crate::domain::result::Result;
use crate::domain::ExportView;
use crate::ports::DocumentWriter;

const PAGE_BREAK: char = '\u{000C}';

pub struct TextDocumentWriter {
    rows_per_page: usize,
}

impl TextDocumentWriter {
    pub fn new(rows_per_page: usize) -> Self {
        Self {
            rows_per_page: rows_per_page.max(1),
        }
    }

    fn page_table(&self, view: &ExportView, rows: &[Vec<JsonValue>]) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Disabled);
        table.set_header(view.columns.iter().map(|c| c.label.as_str()));

        for row in rows {
            table.add_row(row.iter().map(|value| {
                let cell = Cell::new(cell_text(value));
                if value.is_number() {
                    cell.set_alignment(CellAlignment::Right)
                } else {
                    cell
                }
            }));
        }
        table
    }
}

impl DocumentWriter for TextDocumentWriter {
    fn content_type(&self) -> &str {
        "text/plain; charset=utf-8"
    }

    fn extension(&self) -> &str {
        "txt"
    }

    fn write(&self, view: &ExportView) -> Result<Vec<u8>> {
        // An empty report still gets one page with the header row.
        let pages: Vec<&[Vec<JsonValue>]> = if view.rows.is_empty() {
            vec![&view.rows[..]]
        } else {
            view.rows.chunks(self.rows_per_page).collect()
        };
        let total = pages.len();

        let mut out = String::new();
        for (index, rows) in pages.into_iter().enumerate() {
            if index > 0 {
                out.push(PAGE_BREAK);
                out.push('\n');
            }
            out.push_str(&view.title);
            out.push('\n');
            out.push_str(&format!("Page {} of {}\n\n", index + 1, total));
            out.push_str(&self.page_table(view, rows).to_string());
            out.push('\n');
        }
        if view.rows.is_empty() {
            out.push_str("\nNo records found.\n");
        }
        Ok(out.into_bytes())
    }
}
