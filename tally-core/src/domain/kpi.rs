//! KPI payload

use std::collections::BTreeMap;

use serde::Serialize;

use super::change::{change_pct, finite_or_zero};
use super::failure::SourceFailure;
use super::period::ResolvedPeriod;

/// One metric compared across the requested and previous windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiValue {
    pub current: f64,
    pub previous: f64,
    pub change_pct: f64,
}

impl KpiValue {
    pub fn new(current: f64, previous: f64) -> Self {
        let current = finite_or_zero(current);
        let previous = finite_or_zero(previous);
        Self {
            current,
            previous,
            change_pct: change_pct(current, previous),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiResult {
    #[serde(flatten)]
    pub period: ResolvedPeriod,
    pub metrics: BTreeMap<String, KpiValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_errors: Vec<SourceFailure>,
}

impl KpiResult {
    pub fn metric(&self, key: &str) -> Option<&KpiValue> {
        self.metrics.get(key)
    }
}
