//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, ContentArrangement, Table};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    eprintln!("{}", msg.yellow());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Right-aligned amount cell
pub fn amount_cell(value: f64) -> Cell {
    Cell::new(format_amount(value)).set_alignment(CellAlignment::Right)
}

/// Format with two decimals and thousands separators
pub fn format_amount(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}

/// Percent change with an arrow, colored by direction
pub fn format_change(pct: f64) -> String {
    let text = format!("{:+.1}%", pct);
    if pct > 0.0 {
        format!("▲ {text}").green().to_string()
    } else if pct < 0.0 {
        format!("▼ {text}").red().to_string()
    } else {
        text.dimmed().to_string()
    }
}
