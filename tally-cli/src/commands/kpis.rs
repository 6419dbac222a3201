//! KPIs command - period totals compared with the previous period

use anyhow::Result;
use colored::Colorize;
use comfy_table::Cell;
use tally_core::domain::ResolutionMode;

use super::{get_context, print_envelope};
use crate::output::{amount_cell, create_table, format_change, warning};

const ROWS: &[(&str, &str)] = &[
    ("income", "Income"),
    ("expense", "Expenses"),
    ("surplus", "Surplus"),
    ("new_members", "New Members"),
    ("attendance", "Attendance"),
];

pub async fn run(
    tenant: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
    until_now: bool,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let mode = if until_now {
        ResolutionMode::UntilNow
    } else {
        ResolutionMode::DayBounds
    };
    let result = ctx.compute_kpis(tenant, from, to, mode).await;

    if json {
        return print_envelope(result);
    }
    let kpis = result?;

    println!("{}", format!("KPIs for {}", kpis.period.label).bold());
    println!(
        "Compared with {} to {}",
        kpis.period.prev_start.format("%Y-%m-%d"),
        kpis.period.prev_end.format("%Y-%m-%d")
    );
    println!();

    let mut table = create_table();
    table.set_header(vec!["Metric", "Current", "Previous", "Change"]);
    for (key, label) in ROWS {
        if let Some(value) = kpis.metric(key) {
            table.add_row(vec![
                Cell::new(label),
                amount_cell(value.current),
                amount_cell(value.previous),
                Cell::new(format_change(value.change_pct)),
            ]);
        }
    }
    println!("{table}");

    for failure in &kpis.source_errors {
        warning(&format!(
            "Source '{}' failed and was counted as 0: {}",
            failure.source_key, failure.message
        ));
    }
    Ok(())
}
