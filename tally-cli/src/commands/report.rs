//! Report command - tabular module report

use anyhow::Result;
use colored::Colorize;
use tally_core::domain::report::cell_text;

use super::{get_context, print_envelope};
use crate::output::create_table;

pub async fn run(
    tenant: Option<&str>,
    module: &str,
    from: Option<&str>,
    to: Option<&str>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let result = ctx.build_report(tenant, module, from, to).await;

    if json {
        return print_envelope(result);
    }
    let report = result?;

    println!("{}", report.title.bold());
    println!();

    if report.rows.is_empty() {
        println!("No records found.");
        return Ok(());
    }

    let view = report.project(&[]);
    let mut table = create_table();
    table.set_header(view.columns.iter().map(|c| c.label.as_str()));
    for row in &view.rows {
        table.add_row(row.iter().map(cell_text));
    }
    println!("{table}");
    println!("{} rows", view.rows.len());
    Ok(())
}
