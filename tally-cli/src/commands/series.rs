//! Series command - month-by-month totals for a year

use anyhow::Result;
use colored::Colorize;
use comfy_table::Cell;

use super::{get_context, print_envelope};
use crate::output::{amount_cell, create_table, warning};

const COLUMNS: &[(&str, &str)] = &[
    ("income", "Income"),
    ("expense", "Expenses"),
    ("surplus", "Surplus"),
    ("new_members", "New Members"),
    ("attendance", "Attendance"),
];

pub async fn run(tenant: Option<&str>, year: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let result = ctx.compute_series(tenant, year).await;

    if json {
        return print_envelope(result);
    }
    let series = result?;

    println!("{}", format!("Monthly series, {}", series.period.label()).bold());
    println!();

    let mut table = create_table();
    let mut header = vec!["Month"];
    header.extend(COLUMNS.iter().map(|(_, label)| *label));
    table.set_header(header);

    for point in &series.points {
        let mut row = vec![Cell::new(point.month.to_string())];
        row.extend(COLUMNS.iter().map(|(key, _)| amount_cell(point.value(key))));
        table.add_row(row);
    }

    let mut totals = vec![Cell::new("Total".bold())];
    totals.extend(COLUMNS.iter().map(|(key, _)| amount_cell(series.total(key))));
    table.add_row(totals);
    println!("{table}");

    for failure in &series.source_errors {
        warning(&format!(
            "Source '{}' failed and was counted as 0: {}",
            failure.source_key, failure.message
        ));
    }
    Ok(())
}
