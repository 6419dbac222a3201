//! Period summation engine
//!
//! Fans one query per source out concurrently and hands back a per-source
//! outcome. [`Settlement`] then applies the failure policy and reduces the
//! outcomes. Nothing here keeps state between calls.

use std::sync::Arc;

use futures::future::join_all;

use crate::domain::result::{Error, Result};
use crate::domain::{
    AuxiliaryMetric, Domain, FailurePolicy, Measure, MonthTotals, Period, SourceDescriptor,
    SourceFailure, TenantId,
};
use crate::ports::CollectionStore;

/// Result of one source query inside a fan-out.
#[derive(Debug)]
pub struct SourceOutcome<T> {
    pub key: &'static str,
    pub result: Result<T>,
}

/// Name the failing source on an error coming back from the store.
fn attribute_to(key: &str, err: Error) -> Error {
    match err {
        Error::UpstreamQuery { message, .. } => Error::upstream(key, message),
        e if e.is_validation() => e,
        e => Error::upstream(key, e.to_string()),
    }
}

pub struct SummationEngine {
    store: Arc<dyn CollectionStore>,
}

impl SummationEngine {
    pub fn new(store: Arc<dyn CollectionStore>) -> Self {
        Self { store }
    }

    /// Sum one source's amount attribute over `period`
    pub async fn sum_source(
        &self,
        source: &SourceDescriptor,
        tenant: &TenantId,
        period: &Period,
    ) -> Result<f64> {
        self.store
            .sum_where(
                source.collection,
                tenant,
                source.date_attribute,
                source.amount_attribute,
                period,
            )
            .await
            .map_err(|e| attribute_to(source.key, e))
    }

    /// One outcome per source of `domain`, queried concurrently
    pub async fn domain_outcomes(
        &self,
        domain: Domain,
        tenant: &TenantId,
        period: &Period,
    ) -> Vec<SourceOutcome<f64>> {
        let sources = domain.sources();
        tracing::debug!(domain = domain.key(), sources = sources.len(), "Summing domain");
        join_all(sources.iter().map(|source| async move {
            SourceOutcome {
                key: source.key,
                result: self.sum_source(source, tenant, period).await,
            }
        }))
        .await
    }

    /// Total for an auxiliary counter (count or summed attribute)
    pub async fn auxiliary_outcome(
        &self,
        metric: &AuxiliaryMetric,
        tenant: &TenantId,
        period: &Period,
    ) -> SourceOutcome<f64> {
        let result = match metric.measure {
            Measure::Count => self
                .store
                .count_where(metric.collection, tenant, metric.date_attribute, period)
                .await
                .map(|count| count as f64),
            Measure::Sum(attribute) => {
                self.store
                    .sum_where(metric.collection, tenant, metric.date_attribute, attribute, period)
                    .await
            }
        };
        SourceOutcome {
            key: metric.key,
            result: result.map_err(|e| attribute_to(metric.key, e)),
        }
    }

    /// Month totals for every source of `domain`, one grouped query each
    pub async fn domain_monthly(
        &self,
        domain: Domain,
        tenant: &TenantId,
        period: &Period,
    ) -> Vec<SourceOutcome<MonthTotals>> {
        join_all(domain.sources().iter().map(|source| async move {
            let result = self
                .store
                .group_by_month(
                    source.collection,
                    tenant,
                    source.date_attribute,
                    source.measure(),
                    period,
                )
                .await
                .map_err(|e| attribute_to(source.key, e));
            SourceOutcome {
                key: source.key,
                result,
            }
        }))
        .await
    }

    /// Month totals for an auxiliary counter
    pub async fn auxiliary_monthly(
        &self,
        metric: &AuxiliaryMetric,
        tenant: &TenantId,
        period: &Period,
    ) -> SourceOutcome<MonthTotals> {
        let result = self
            .store
            .group_by_month(
                metric.collection,
                tenant,
                metric.date_attribute,
                metric.measure,
                period,
            )
            .await
            .map_err(|e| attribute_to(metric.key, e));
        SourceOutcome {
            key: metric.key,
            result,
        }
    }
}

/// Applies a [`FailurePolicy`] to fan-out outcomes and keeps the failures it let through.
#[derive(Debug)]
pub struct Settlement {
    policy: FailurePolicy,
    failures: Vec<SourceFailure>,
}

impl Settlement {
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            failures: Vec::new(),
        }
    }

    /// Successful values in input order; failed sources are dropped under `Isolate`
    pub fn settle<T>(&mut self, outcomes: Vec<SourceOutcome<T>>) -> Result<Vec<(&'static str, T)>> {
        let mut values = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome.result {
                Ok(value) => values.push((outcome.key, value)),
                Err(err) => match self.policy {
                    FailurePolicy::Abort => return Err(err),
                    FailurePolicy::Isolate => {
                        tracing::warn!(source = outcome.key, error = %err, "Source failed, counting as 0");
                        self.record(outcome.key, &err);
                    }
                },
            }
        }
        Ok(values)
    }

    pub fn settle_one<T: Default>(&mut self, outcome: SourceOutcome<T>) -> Result<T> {
        Ok(self
            .settle(vec![outcome])?
            .pop()
            .map(|(_, value)| value)
            .unwrap_or_default())
    }

    /// Sum of the successful outcomes
    pub fn total(&mut self, outcomes: Vec<SourceOutcome<f64>>) -> Result<f64> {
        Ok(self.settle(outcomes)?.into_iter().map(|(_, v)| v).sum())
    }

    fn record(&mut self, key: &str, err: &Error) {
        if self.failures.iter().any(|f| f.source_key == key) {
            return;
        }
        let message = match err {
            Error::UpstreamQuery { message, .. } => message.clone(),
            other => other.to_string(),
        };
        self.failures.push(SourceFailure {
            source_key: key.to_string(),
            message,
        });
    }

    pub fn into_failures(self) -> Vec<SourceFailure> {
        self.failures
    }
}
