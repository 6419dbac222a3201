//! CLI command implementations

pub mod demo;
pub mod export;
pub mod kpis;
pub mod report;
pub mod series;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tally_core::{OperationResult, TallyContext};

/// Get the tally directory from environment or default
pub fn get_tally_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TALLY_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".tally"))
        .context("Could not find home directory; set TALLY_DIR")
}

/// Open the tally context for the configured directory
pub fn get_context() -> Result<TallyContext> {
    let tally_dir = get_tally_dir()?;
    tracing::debug!(dir = %tally_dir.display(), "Opening tally directory");
    std::fs::create_dir_all(&tally_dir)
        .with_context(|| format!("Failed to create tally directory: {:?}", tally_dir))?;
    TallyContext::new(&tally_dir)
}

/// Print the JSON envelope for an operation; a failed operation still fails the command
pub fn print_envelope<T: Serialize>(result: tally_core::Result<T>) -> Result<()> {
    let failed = result.is_err();
    let envelope = OperationResult::from(result);
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    if failed {
        bail!(envelope.error.unwrap_or_else(|| "operation failed".to_string()));
    }
    Ok(())
}
