//! KPI composer
//!
//! Domain totals and auxiliary counters for the requested window and its
//! previous window, all queried concurrently and assembled into one
//! [`KpiResult`].

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::clock::Clock;
use crate::domain::period::resolve_period;
use crate::domain::result::Result;
use crate::domain::source::{ATTENDANCE, NEW_MEMBERS};
use crate::domain::{Domain, FailurePolicy, KpiResult, KpiValue, ResolutionMode, TenantId};

use super::series::{EXPENSE, INCOME, SURPLUS};
use super::summation::{Settlement, SummationEngine};

pub struct KpiService {
    engine: Arc<SummationEngine>,
    clock: Arc<dyn Clock>,
    policy: FailurePolicy,
}

impl KpiService {
    pub fn new(engine: Arc<SummationEngine>, clock: Arc<dyn Clock>, policy: FailurePolicy) -> Self {
        Self {
            engine,
            clock,
            policy,
        }
    }

    pub async fn compute_kpis(
        &self,
        tenant: &TenantId,
        from: Option<&str>,
        to: Option<&str>,
        mode: ResolutionMode,
    ) -> Result<KpiResult> {
        let resolved = resolve_period(from, to, mode, self.clock.now())?;
        let current = resolved.current();
        let previous = resolved.previous();
        tracing::debug!(tenant = %tenant, label = %resolved.label, "Computing KPIs");

        let engine = &self.engine;
        let (
            income_now,
            income_prev,
            expense_now,
            expense_prev,
            members_now,
            members_prev,
            attendance_now,
            attendance_prev,
        ) = tokio::join!(
            engine.domain_outcomes(Domain::Income, tenant, &current),
            engine.domain_outcomes(Domain::Income, tenant, &previous),
            engine.domain_outcomes(Domain::Expense, tenant, &current),
            engine.domain_outcomes(Domain::Expense, tenant, &previous),
            engine.auxiliary_outcome(&NEW_MEMBERS, tenant, &current),
            engine.auxiliary_outcome(&NEW_MEMBERS, tenant, &previous),
            engine.auxiliary_outcome(&ATTENDANCE, tenant, &current),
            engine.auxiliary_outcome(&ATTENDANCE, tenant, &previous),
        );

        let mut settlement = Settlement::new(self.policy);
        let income = KpiValue::new(settlement.total(income_now)?, settlement.total(income_prev)?);
        let expense = KpiValue::new(settlement.total(expense_now)?, settlement.total(expense_prev)?);
        let surplus = KpiValue::new(
            income.current - expense.current,
            income.previous - expense.previous,
        );
        let new_members = KpiValue::new(
            settlement.settle_one(members_now)?,
            settlement.settle_one(members_prev)?,
        );
        let attendance = KpiValue::new(
            settlement.settle_one(attendance_now)?,
            settlement.settle_one(attendance_prev)?,
        );

        let metrics = BTreeMap::from([
            (INCOME.to_string(), income),
            (EXPENSE.to_string(), expense),
            (SURPLUS.to_string(), surplus),
            (NEW_MEMBERS.key.to_string(), new_members),
            (ATTENDANCE.key.to_string(), attendance),
        ]);

        Ok(KpiResult {
            period: resolved,
            metrics,
            source_errors: settlement.into_failures(),
        })
    }
}
