//! Monthly series values and the pure merge steps that build them

use std::collections::BTreeMap;

use serde::Serialize;

use super::failure::SourceFailure;
use super::period::{MonthKey, Period};

/// Per-month totals for one source or metric.
pub type MonthTotals = BTreeMap<MonthKey, f64>;

/// One calendar month of merged metric values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub month: MonthKey,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl SeriesPoint {
    pub fn value(&self, metric: &str) -> f64 {
        self.values.get(metric).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub period: Period,
    pub points: Vec<SeriesPoint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_errors: Vec<SourceFailure>,
}

impl Series {
    /// Sum of one metric across all points
    pub fn total(&self, metric: &str) -> f64 {
        self.points.iter().map(|p| p.value(metric)).sum()
    }
}

/// Key-wise sum of month maps.
pub fn merge_month_totals<'a>(maps: impl IntoIterator<Item = &'a MonthTotals>) -> MonthTotals {
    maps.into_iter().fold(MonthTotals::new(), |mut acc, map| {
        for (month, value) in map {
            *acc.entry(*month).or_insert(0.0) += value;
        }
        acc
    })
}

/// Key-wise `left - right`.
pub fn subtract_month_totals(left: &MonthTotals, right: &MonthTotals) -> MonthTotals {
    let mut out = left.clone();
    for (month, value) in right {
        *out.entry(*month).or_insert(0.0) -= value;
    }
    out
}

/// Lay every metric over the month enumeration, filling gaps with 0.
///
/// Output follows `months` order; months outside it are ignored.
pub fn blend(months: &[MonthKey], metrics: &[(&str, &MonthTotals)]) -> Vec<SeriesPoint> {
    months
        .iter()
        .map(|month| SeriesPoint {
            month: *month,
            values: metrics
                .iter()
                .map(|(key, totals)| (key.to_string(), totals.get(month).copied().unwrap_or(0.0)))
                .collect(),
        })
        .collect()
}
