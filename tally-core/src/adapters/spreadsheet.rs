//! Single-sheet XLSX writer
//!
//! Builds the minimal set of Office Open XML parts by hand and packs them
//! with `zip`. Style 1 is the bold header style.

use std::io::{Cursor, Write};

use serde_json::Value as JsonValue;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::domain::report::cell_text;
use crate::domain::result::Result;
use crate::domain::ExportView;
use crate::ports::SpreadsheetWriter;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

const BOLD_STYLE: usize = 1;

#[derive(Debug, Clone, Default)]
pub struct XlsxWorkbookWriter;

impl XlsxWorkbookWriter {
    pub fn new() -> Self {
        Self
    }
}

impl SpreadsheetWriter for XlsxWorkbookWriter {
    fn content_type(&self) -> &str {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    }

    fn extension(&self) -> &str {
        "xlsx"
    }

    fn write(&self, view: &ExportView) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let parts = [
            ("[Content_Types].xml", CONTENT_TYPES.to_string()),
            ("_rels/.rels", ROOT_RELS.to_string()),
            ("xl/workbook.xml", workbook_xml(&view.title)),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
            ("xl/styles.xml", STYLES.to_string()),
            ("xl/worksheets/sheet1.xml", sheet_xml(view)),
        ];
        for (name, body) in parts {
            zip.start_file(name, options)?;
            zip.write_all(body.as_bytes())?;
        }

        Ok(zip.finish()?.into_inner())
    }
}

fn workbook_xml(title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        escape(&sheet_name(title))
    )
}

fn sheet_xml(view: &ExportView) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    xml.push_str(r#"<row r="1">"#);
    for (col, column) in view.columns.iter().enumerate() {
        xml.push_str(&string_cell(&cell_ref(col, 1), &column.label, Some(BOLD_STYLE)));
    }
    xml.push_str("</row>");

    for (index, row) in view.rows.iter().enumerate() {
        let line = index + 2;
        xml.push_str(&format!(r#"<row r="{line}">"#));
        for (col, value) in row.iter().enumerate() {
            let reference = cell_ref(col, line);
            match value {
                JsonValue::Number(n) => match n.as_f64() {
                    Some(f) if f.is_finite() => {
                        xml.push_str(&format!(r#"<c r="{reference}"><v>{f}</v></c>"#))
                    }
                    _ => xml.push_str(&string_cell(&reference, &cell_text(value), None)),
                },
                other => xml.push_str(&string_cell(&reference, &cell_text(other), None)),
            }
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn string_cell(reference: &str, text: &str, style: Option<usize>) -> String {
    let style = style.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();
    format!(
        r#"<c r="{reference}" t="inlineStr"{style}><is><t xml:space="preserve">{}</t></is></c>"#,
        escape(text)
    )
}

/// Spreadsheet column letters for a zero-based index (0 -> A, 26 -> AA).
fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn cell_ref(col: usize, line: usize) -> String {
    format!("{}{}", column_letters(col), line)
}

/// Sheet names are at most 31 chars and exclude `[]:*?/\`.
fn sheet_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    if cleaned.trim().is_empty() {
        "Report".to_string()
    } else {
        cleaned
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}
