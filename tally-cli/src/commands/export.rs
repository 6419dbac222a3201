//! Export command - write a report document or workbook to disk

use std::path::PathBuf;

use anyhow::{Context, Result};
use tally_core::ExportRequest;

use super::get_context;
use crate::output::success;

pub async fn run(
    tenant: Option<&str>,
    module: &str,
    format: &str,
    fields: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
    output: Option<PathBuf>,
) -> Result<()> {
    let ctx = get_context()?;
    let request = ExportRequest {
        tenant,
        module,
        format,
        from,
        to,
        fields,
    };
    let file = ctx.build_and_export_report(&request).await?;

    let path = output.unwrap_or_else(|| PathBuf::from(&file.file_name));
    std::fs::write(&path, &file.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    success(&format!(
        "Wrote {} ({}, {} bytes)",
        path.display(),
        file.content_type,
        file.bytes.len()
    ));
    Ok(())
}
