//! Collection store port - read access to tenant record collections

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::domain::result::Result;
use crate::domain::{Measure, MonthTotals, Period, TenantId};

/// A raw record as stored in a collection (attribute name to value).
pub type Record = serde_json::Map<String, JsonValue>;

/// Inclusive date filter on one attribute.
#[derive(Debug, Clone, Copy)]
pub struct DateFilter<'a> {
    pub attribute: &'a str,
    pub period: Period,
}

#[derive(Debug, Clone, Copy)]
pub struct SortOrder<'a> {
    pub attribute: &'a str,
    pub descending: bool,
}

/// Record lookup used by module reports.
#[derive(Debug, Clone, Copy)]
pub struct FindQuery<'a> {
    pub collection: &'a str,
    pub date_filter: Option<DateFilter<'a>>,
    pub sort: Option<SortOrder<'a>>,
    pub limit: usize,
}

/// Read-only query interface over tenant-scoped collections
///
/// Every method takes the tenant explicitly; implementations must never
/// return records belonging to another tenant. Range bounds are inclusive
/// on both ends. Amounts that are missing or not finite count as 0.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Sum of `amount_attribute` over records whose date falls in `period`
    async fn sum_where(
        &self,
        collection: &str,
        tenant: &TenantId,
        date_attribute: &str,
        amount_attribute: &str,
        period: &Period,
    ) -> Result<f64>;

    /// Number of records whose date falls in `period`
    async fn count_where(
        &self,
        collection: &str,
        tenant: &TenantId,
        date_attribute: &str,
        period: &Period,
    ) -> Result<u64>;

    /// Per-month aggregate in one grouped query; months without records are absent
    async fn group_by_month(
        &self,
        collection: &str,
        tenant: &TenantId,
        date_attribute: &str,
        measure: Measure,
        period: &Period,
    ) -> Result<MonthTotals>;

    /// Raw records matching the query, sorted and capped at `limit`
    async fn find_where(&self, tenant: &TenantId, query: &FindQuery<'_>) -> Result<Vec<Record>>;
}
