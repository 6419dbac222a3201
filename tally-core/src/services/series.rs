//! Monthly series builder

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;

use crate::clock::Clock;
use crate::domain::result::Result;
use crate::domain::series::{blend, merge_month_totals, subtract_month_totals};
use crate::domain::source::AUXILIARY_METRICS;
use crate::domain::{Domain, FailurePolicy, MonthTotals, Period, Series, TenantId};

use super::summation::{Settlement, SummationEngine};

pub const INCOME: &str = "income";
pub const EXPENSE: &str = "expense";
pub const SURPLUS: &str = "surplus";

pub struct SeriesService {
    engine: Arc<SummationEngine>,
    clock: Arc<dyn Clock>,
    policy: FailurePolicy,
}

impl SeriesService {
    pub fn new(engine: Arc<SummationEngine>, clock: Arc<dyn Clock>, policy: FailurePolicy) -> Self {
        Self {
            engine,
            clock,
            policy,
        }
    }

    /// January to December of `year`, or of the current year when absent
    pub async fn compute_series(&self, tenant: &TenantId, year: Option<i32>) -> Result<Series> {
        let year = year.unwrap_or_else(|| self.clock.current_year());
        let period = Period::calendar_year(year)?;
        self.series_for_range(tenant, &period).await
    }

    /// One point per calendar month touched by `period`, in chronological order
    pub async fn series_for_range(&self, tenant: &TenantId, period: &Period) -> Result<Series> {
        let months = period.months();
        tracing::debug!(tenant = %tenant, months = months.len(), "Building monthly series");

        let (income, expense, auxiliary) = tokio::join!(
            self.engine.domain_monthly(Domain::Income, tenant, period),
            self.engine.domain_monthly(Domain::Expense, tenant, period),
            join_all(
                AUXILIARY_METRICS
                    .iter()
                    .map(|metric| self.engine.auxiliary_monthly(metric, tenant, period))
            ),
        );

        let mut settlement = Settlement::new(self.policy);
        let income = settlement.settle(income)?;
        let expense = settlement.settle(expense)?;
        let auxiliary = settlement.settle(auxiliary)?;

        let income_total = merge_month_totals(income.iter().map(|(_, totals)| totals));
        let expense_total = merge_month_totals(expense.iter().map(|(_, totals)| totals));
        let surplus = subtract_month_totals(&income_total, &expense_total);

        // Failed sources still get a column of zeros.
        let empty = MonthTotals::new();
        let mut per_source: BTreeMap<&str, &MonthTotals> = Domain::Income
            .sources()
            .iter()
            .chain(Domain::Expense.sources())
            .map(|source| (source.key, &empty))
            .collect();
        for (key, totals) in income.iter().chain(expense.iter()) {
            per_source.insert(*key, totals);
        }
        let mut aux: BTreeMap<&str, &MonthTotals> =
            AUXILIARY_METRICS.iter().map(|m| (m.key, &empty)).collect();
        for (key, totals) in &auxiliary {
            aux.insert(*key, totals);
        }

        let mut metrics: Vec<(&str, &MonthTotals)> = per_source.into_iter().collect();
        metrics.push((INCOME, &income_total));
        metrics.push((EXPENSE, &expense_total));
        metrics.push((SURPLUS, &surplus));
        metrics.extend(aux);

        Ok(Series {
            period: *period,
            points: blend(&months, &metrics),
            source_errors: settlement.into_failures(),
        })
    }
}
