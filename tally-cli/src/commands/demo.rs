//! Demo command - seed sample data for a tenant

use anyhow::{Context, Result};
use colored::Colorize;
use tally_core::TenantId;

use super::get_context;
use crate::output::create_table;

pub fn run(tenant: Option<&str>, year: Option<i32>) -> Result<()> {
    let ctx = get_context()?;
    let tenant = TenantId::resolve(tenant)?;
    let year = year.unwrap_or_else(|| ctx.clock.current_year());

    let demo_service = ctx
        .demo_service()
        .context("Demo data needs a database-backed context")?;
    let summary = demo_service.seed(&tenant, year)?;

    let mut table = create_table();
    table.set_header(vec!["Collection", "Records"]);
    for (collection, count) in &summary.collections {
        table.add_row(vec![collection.clone(), count.to_string()]);
    }
    println!("{table}");

    println!(
        "{}",
        format!("Seeded {} records for '{}' ({year})", summary.total(), tenant).green()
    );
    println!("Run 'tally kpis --tenant {tenant} --from {year}-01-01 --to {year}-12-31' to see them.");
    Ok(())
}
