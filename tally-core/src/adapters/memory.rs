//! In-memory collection store for tests and embedding.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use crate::domain::change::finite_or_zero;
use crate::domain::period::parse_instant;
use crate::domain::result::{Error, Result};
use crate::domain::{Measure, MonthKey, MonthTotals, Period, TenantId};
use crate::ports::{CollectionStore, FindQuery, Record};

/// In-memory collections keyed by name. Records carry a `tenant_id` attribute.
pub struct MemoryCollections {
    collections: RwLock<HashMap<String, Vec<Record>>>,
    failing: RwLock<HashSet<String>>,
}

impl MemoryCollections {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// Add a record for `tenant`. Non-object values are rejected.
    pub async fn insert(&self, collection: &str, tenant: &TenantId, record: JsonValue) -> Result<()> {
        let JsonValue::Object(mut record) = record else {
            return Err(Error::database(format!(
                "records in {collection} must be JSON objects"
            )));
        };
        record.insert("tenant_id".to_string(), JsonValue::String(tenant.to_string()));
        let mut collections = self.collections.write().await;
        collections.entry(collection.to_string()).or_default().push(record);
        Ok(())
    }

    /// Make every query against `collection` fail from now on.
    pub async fn fail_collection(&self, collection: &str) {
        self.failing.write().await.insert(collection.to_string());
    }

    async fn scoped(&self, collection: &str, tenant: &TenantId) -> Result<Vec<Record>> {
        if self.failing.read().await.contains(collection) {
            return Err(Error::upstream(collection, "collection unavailable"));
        }
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.get("tenant_id").and_then(JsonValue::as_str) == Some(tenant.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn in_period(
        &self,
        collection: &str,
        tenant: &TenantId,
        date_attribute: &str,
        period: &Period,
    ) -> Result<Vec<(NaiveDateTime, Record)>> {
        Ok(self
            .scoped(collection, tenant)
            .await?
            .into_iter()
            .filter_map(|r| record_instant(&r, date_attribute).map(|at| (at, r)))
            .filter(|(at, _)| period.contains(*at))
            .collect())
    }
}

impl Default for MemoryCollections {
    fn default() -> Self {
        Self::new()
    }
}

fn record_instant(record: &Record, attribute: &str) -> Option<NaiveDateTime> {
    record.get(attribute).and_then(JsonValue::as_str).and_then(parse_instant)
}

fn record_amount(record: &Record, attribute: &str) -> f64 {
    let value = match record.get(attribute) {
        Some(JsonValue::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    finite_or_zero(value)
}

fn measure_value(record: &Record, measure: Measure) -> f64 {
    match measure {
        Measure::Sum(attribute) => record_amount(record, attribute),
        Measure::Count => 1.0,
    }
}

fn compare_attribute(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    match (a, b) {
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        (Some(JsonValue::Null) | None, Some(JsonValue::Null) | None) => Ordering::Equal,
        (Some(JsonValue::Null) | None, _) => Ordering::Greater,
        (_, Some(JsonValue::Null) | None) => Ordering::Less,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[async_trait]
impl CollectionStore for MemoryCollections {
    async fn sum_where(
        &self,
        collection: &str,
        tenant: &TenantId,
        date_attribute: &str,
        amount_attribute: &str,
        period: &Period,
    ) -> Result<f64> {
        let records = self.in_period(collection, tenant, date_attribute, period).await?;
        Ok(records
            .iter()
            .map(|(_, r)| record_amount(r, amount_attribute))
            .sum())
    }

    async fn count_where(
        &self,
        collection: &str,
        tenant: &TenantId,
        date_attribute: &str,
        period: &Period,
    ) -> Result<u64> {
        let records = self.in_period(collection, tenant, date_attribute, period).await?;
        Ok(records.len() as u64)
    }

    async fn group_by_month(
        &self,
        collection: &str,
        tenant: &TenantId,
        date_attribute: &str,
        measure: Measure,
        period: &Period,
    ) -> Result<MonthTotals> {
        let records = self.in_period(collection, tenant, date_attribute, period).await?;
        let mut totals = MonthTotals::new();
        for (at, record) in &records {
            *totals.entry(MonthKey::of(*at)).or_insert(0.0) += measure_value(record, measure);
        }
        Ok(totals)
    }

    async fn find_where(&self, tenant: &TenantId, query: &FindQuery<'_>) -> Result<Vec<Record>> {
        let mut records = match query.date_filter {
            Some(filter) => self
                .in_period(query.collection, tenant, filter.attribute, &filter.period)
                .await?
                .into_iter()
                .map(|(_, r)| r)
                .collect(),
            None => self.scoped(query.collection, tenant).await?,
        };

        if let Some(sort) = query.sort {
            records.sort_by(|a, b| {
                let ordering = compare_attribute(a.get(sort.attribute), b.get(sort.attribute));
                if sort.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        records.truncate(query.limit);
        Ok(records)
    }
}
