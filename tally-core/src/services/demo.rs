//! Demo service - seed sample records for a tenant
//!
//! Gives an empty database something to report on.

use std::sync::Arc;

use crate::adapters::demo::generate_demo_records;
use crate::adapters::duckdb::DuckDbCollections;
use crate::domain::result::Result;
use crate::domain::TenantId;

/// Records written per collection
#[derive(Debug, Default)]
pub struct SeedSummary {
    pub collections: Vec<(String, usize)>,
}

impl SeedSummary {
    pub fn total(&self) -> usize {
        self.collections.iter().map(|(_, n)| n).sum()
    }
}

pub struct DemoService {
    store: Arc<DuckDbCollections>,
}

impl DemoService {
    pub fn new(store: Arc<DuckDbCollections>) -> Self {
        Self { store }
    }

    /// Insert a year of sample data for `tenant`
    pub fn seed(&self, tenant: &TenantId, year: i32) -> Result<SeedSummary> {
        self.store.ensure_schema()?;

        let mut summary = SeedSummary::default();
        for (collection, records) in generate_demo_records(year) {
            let written = self.store.insert_records(collection, tenant, &records)?;
            tracing::debug!(collection, written, "Seeded collection");
            summary.collections.push((collection.to_string(), written));
        }

        tracing::info!(tenant = %tenant, year, records = summary.total(), "Seeded demo data");
        Ok(summary)
    }
}
