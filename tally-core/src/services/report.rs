//! Module report builder
//!
//! Every report is keyed by a [`ModuleKey`]. A module owns the collections
//! it reads, how each one is filtered and sorted, its column list and a
//! typed record that maps into a row. Modules reading two collections tag
//! each row with a `kind` column and interleave them by date.

use std::sync::Arc;

use chrono::NaiveDateTime;
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use crate::domain::change::finite_or_zero;
use crate::domain::period::{parse_instant, resolve_period};
use crate::domain::report::PLACEHOLDER;
use crate::domain::result::{Error, Result};
use crate::domain::{Column, Period, Report, ResolutionMode, Row, TenantId};
use crate::ports::{CollectionStore, DateFilter, FindQuery, Record, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKey {
    Members,
    Attendance,
    Tithes,
    Offerings,
    Welfare,
    Projects,
    Expenses,
    Pledges,
}

impl ModuleKey {
    pub const ALL: [ModuleKey; 8] = [
        ModuleKey::Members,
        ModuleKey::Attendance,
        ModuleKey::Tithes,
        ModuleKey::Offerings,
        ModuleKey::Welfare,
        ModuleKey::Projects,
        ModuleKey::Expenses,
        ModuleKey::Pledges,
    ];

    pub fn parse(raw: &str) -> Result<Self> {
        let wanted = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|module| module.key() == wanted)
            .ok_or_else(|| Error::UnsupportedModule(raw.to_string()))
    }

    pub fn key(self) -> &'static str {
        match self {
            ModuleKey::Members => "members",
            ModuleKey::Attendance => "attendance",
            ModuleKey::Tithes => "tithes",
            ModuleKey::Offerings => "offerings",
            ModuleKey::Welfare => "welfare",
            ModuleKey::Projects => "projects",
            ModuleKey::Expenses => "expenses",
            ModuleKey::Pledges => "pledges",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ModuleKey::Members => "Members Report",
            ModuleKey::Attendance => "Attendance Report",
            ModuleKey::Tithes => "Tithes Report",
            ModuleKey::Offerings => "Offerings Report",
            ModuleKey::Welfare => "Welfare Report",
            ModuleKey::Projects => "Projects Report",
            ModuleKey::Expenses => "Expenses Report",
            ModuleKey::Pledges => "Pledge Payments Report",
        }
    }

    /// Default columns followed by columns only available on request
    fn columns(self) -> (&'static [(&'static str, &'static str)], &'static [(&'static str, &'static str)]) {
        match self {
            ModuleKey::Members => (
                &[
                    ("name", "Name"),
                    ("email", "Email"),
                    ("phone", "Phone"),
                    ("status", "Status"),
                    ("join_date", "Joined"),
                ],
                &[("gender", "Gender")],
            ),
            ModuleKey::Attendance => (
                &[
                    ("date", "Date"),
                    ("service_type", "Service"),
                    ("men", "Men"),
                    ("women", "Women"),
                    ("children", "Children"),
                    ("total", "Total"),
                ],
                &[],
            ),
            ModuleKey::Tithes => (
                &[
                    ("date", "Date"),
                    ("kind", "Type"),
                    ("member", "Member"),
                    ("amount", "Amount"),
                ],
                &[
                    ("payment_method", "Payment Method"),
                    ("reference", "Reference"),
                    ("notes", "Notes"),
                ],
            ),
            ModuleKey::Offerings => (
                &[
                    ("date", "Date"),
                    ("service_type", "Service"),
                    ("amount", "Amount"),
                ],
                &[("counted_by", "Counted By"), ("notes", "Notes")],
            ),
            ModuleKey::Welfare => (
                &[
                    ("date", "Date"),
                    ("kind", "Type"),
                    ("person", "Member / Beneficiary"),
                    ("amount", "Amount"),
                ],
                &[("details", "Details"), ("payment_method", "Payment Method")],
            ),
            ModuleKey::Projects => (
                &[
                    ("date", "Date"),
                    ("kind", "Type"),
                    ("project", "Project"),
                    ("party", "Contributor / Payee"),
                    ("amount", "Amount"),
                ],
                &[("details", "Details")],
            ),
            ModuleKey::Expenses => (
                &[
                    ("date", "Date"),
                    ("category", "Category"),
                    ("description", "Description"),
                    ("paid_to", "Paid To"),
                    ("amount", "Amount"),
                ],
                &[("approved_by", "Approved By")],
            ),
            ModuleKey::Pledges => (
                &[
                    ("date", "Date"),
                    ("pledge", "Pledge"),
                    ("member", "Member"),
                    ("amount", "Amount"),
                ],
                &[("payment_method", "Payment Method")],
            ),
        }
    }

    fn parts(self) -> Vec<Part> {
        match self {
            ModuleKey::Members => vec![Part {
                collection: "members",
                date_filter: None,
                sort: SortOrder {
                    attribute: "first_name",
                    descending: false,
                },
                decode: decode::<MemberRecord>,
            }],
            ModuleKey::Attendance => vec![Part::dated("attendance", "service_date", decode::<AttendanceRecord>)],
            ModuleKey::Tithes => vec![
                Part::dated("tithes", "giving_date", decode::<TitheRecord>),
                Part::dated("tithe_aggregates", "service_date", decode::<TitheAggregateRecord>),
            ],
            ModuleKey::Offerings => vec![Part::dated("service_offerings", "service_date", decode::<OfferingRecord>)],
            ModuleKey::Welfare => vec![
                Part::dated("welfare_contributions", "contribution_date", decode::<WelfareContributionRecord>),
                Part::dated("welfare_disbursements", "disbursement_date", decode::<WelfareDisbursementRecord>),
            ],
            ModuleKey::Projects => vec![
                Part::dated("project_contributions", "contribution_date", decode::<ProjectContributionRecord>),
                Part::dated("project_expenses", "expense_date", decode::<ProjectExpenseRecord>),
            ],
            ModuleKey::Expenses => vec![Part::dated("expenses", "date_spent", decode::<ExpenseRecord>)],
            ModuleKey::Pledges => vec![Part::dated("pledge_payments", "payment_date", decode::<PledgePaymentRecord>)],
        }
    }
}

impl std::fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A decoded row plus the instant used to interleave combined collections.
type DatedRow = (Option<NaiveDateTime>, Row);

/// One collection read by a module.
struct Part {
    collection: &'static str,
    /// Attribute the optional range applies to; `None` reads a snapshot
    date_filter: Option<&'static str>,
    sort: SortOrder<'static>,
    decode: fn(Record) -> serde_json::Result<DatedRow>,
}

impl Part {
    /// Range-filtered and newest first
    fn dated(
        collection: &'static str,
        date_attribute: &'static str,
        decode: fn(Record) -> serde_json::Result<DatedRow>,
    ) -> Self {
        Self {
            collection,
            date_filter: Some(date_attribute),
            sort: SortOrder {
                attribute: date_attribute,
                descending: true,
            },
            decode,
        }
    }
}

trait ModuleRecord: DeserializeOwned {
    fn date(&self) -> Option<NaiveDateTime>;
    fn into_row(self) -> Row;
}

fn decode<T: ModuleRecord>(record: Record) -> serde_json::Result<DatedRow> {
    let typed: T = serde_json::from_value(JsonValue::Object(record))?;
    Ok((typed.date(), typed.into_row()))
}

/// Resolve optional report bounds; no bounds at all means no date filter.
pub fn report_range(from: Option<&str>, to: Option<&str>, now: NaiveDateTime) -> Result<Option<Period>> {
    if from.is_none() && to.is_none() {
        return Ok(None);
    }
    Ok(Some(resolve_period(from, to, ResolutionMode::DayBounds, now)?.current()))
}

pub struct ReportService {
    store: Arc<dyn CollectionStore>,
    row_limit: usize,
}

impl ReportService {
    pub fn new(store: Arc<dyn CollectionStore>, row_limit: usize) -> Self {
        Self { store, row_limit }
    }

    pub async fn build_report(
        &self,
        module: ModuleKey,
        tenant: &TenantId,
        range: Option<Period>,
    ) -> Result<Report> {
        let parts = module.parts();
        let fetched = try_join_all(parts.iter().map(|part| self.fetch(part, tenant, range))).await?;

        let mut rows: Vec<DatedRow> = fetched.into_iter().flatten().collect();
        if parts.len() > 1 {
            rows.sort_by(|a, b| b.0.cmp(&a.0));
        }
        rows.truncate(self.row_limit);

        let (defaults, extras) = module.columns();
        let columns: Vec<Column> = defaults.iter().map(|(k, l)| Column::new(k, l)).collect();
        let available_columns = columns
            .iter()
            .cloned()
            .chain(extras.iter().map(|(k, l)| Column::new(k, l)))
            .collect();

        tracing::info!(module = %module, tenant = %tenant, rows = rows.len(), "Built report");
        Ok(Report {
            title: module.title().to_string(),
            columns,
            available_columns,
            rows: rows.into_iter().map(|(_, row)| row).collect(),
        })
    }

    async fn fetch(&self, part: &Part, tenant: &TenantId, range: Option<Period>) -> Result<Vec<DatedRow>> {
        let query = FindQuery {
            collection: part.collection,
            date_filter: part
                .date_filter
                .zip(range)
                .map(|(attribute, period)| DateFilter { attribute, period }),
            sort: Some(part.sort),
            limit: self.row_limit,
        };
        let records = self.store.find_where(tenant, &query).await?;

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let id = record.get("id").cloned().unwrap_or(JsonValue::Null);
            match (part.decode)(record) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    tracing::warn!(collection = part.collection, id = %id, error = %e, "Skipping undecodable record")
                }
            }
        }
        Ok(rows)
    }
}

// --- cell helpers ---

fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    let amount = match value {
        Some(JsonValue::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(finite_or_zero(amount))
}

fn placeholder() -> JsonValue {
    JsonValue::String(PLACEHOLDER.to_string())
}

fn text(value: Option<String>) -> JsonValue {
    match value {
        Some(s) if !s.trim().is_empty() => JsonValue::String(s.trim().to_string()),
        _ => placeholder(),
    }
}

fn label(value: &str) -> JsonValue {
    JsonValue::String(value.to_string())
}

fn instant(raw: &Option<String>) -> Option<NaiveDateTime> {
    raw.as_deref().and_then(parse_instant)
}

fn day(raw: &Option<String>) -> JsonValue {
    instant(raw)
        .map(|at| JsonValue::String(at.format("%Y-%m-%d").to_string()))
        .unwrap_or_else(placeholder)
}

fn money(amount: f64) -> JsonValue {
    serde_json::json!((amount * 100.0).round() / 100.0)
}

fn whole(value: f64) -> JsonValue {
    serde_json::json!(value.round() as i64)
}

fn row<const N: usize>(cells: [(&str, JsonValue); N]) -> Row {
    cells.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

// --- typed records ---

#[derive(Debug, Deserialize)]
struct MemberRecord {
    first_name: String,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    gender: Option<String>,
    status: Option<String>,
    join_date: Option<String>,
}

impl ModuleRecord for MemberRecord {
    fn date(&self) -> Option<NaiveDateTime> {
        instant(&self.join_date)
    }

    fn into_row(self) -> Row {
        let name = match self.last_name.as_deref().map(str::trim) {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name.trim(), last),
            _ => self.first_name.trim().to_string(),
        };
        row([
            ("name", text(Some(name))),
            ("email", text(self.email)),
            ("phone", text(self.phone)),
            ("status", text(self.status)),
            ("join_date", day(&self.join_date)),
            ("gender", text(self.gender)),
        ])
    }
}

#[derive(Debug, Deserialize)]
struct AttendanceRecord {
    service_date: Option<String>,
    service_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    men: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    women: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    children: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    total_attendance: f64,
}

impl ModuleRecord for AttendanceRecord {
    fn date(&self) -> Option<NaiveDateTime> {
        instant(&self.service_date)
    }

    fn into_row(self) -> Row {
        row([
            ("date", day(&self.service_date)),
            ("service_type", text(self.service_type)),
            ("men", whole(self.men)),
            ("women", whole(self.women)),
            ("children", whole(self.children)),
            ("total", whole(self.total_attendance)),
        ])
    }
}

#[derive(Debug, Deserialize)]
struct TitheRecord {
    giving_date: Option<String>,
    member_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    amount: f64,
    payment_method: Option<String>,
    reference: Option<String>,
}

impl ModuleRecord for TitheRecord {
    fn date(&self) -> Option<NaiveDateTime> {
        instant(&self.giving_date)
    }

    fn into_row(self) -> Row {
        row([
            ("date", day(&self.giving_date)),
            ("kind", label("Individual")),
            ("member", text(self.member_name)),
            ("amount", money(self.amount)),
            ("payment_method", text(self.payment_method)),
            ("reference", text(self.reference)),
            ("notes", placeholder()),
        ])
    }
}

#[derive(Debug, Deserialize)]
struct TitheAggregateRecord {
    service_date: Option<String>,
    service_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    total_amount: f64,
    notes: Option<String>,
}

impl ModuleRecord for TitheAggregateRecord {
    fn date(&self) -> Option<NaiveDateTime> {
        instant(&self.service_date)
    }

    fn into_row(self) -> Row {
        row([
            ("date", day(&self.service_date)),
            ("kind", label("Aggregate")),
            ("member", text(self.service_type)),
            ("amount", money(self.total_amount)),
            ("payment_method", placeholder()),
            ("reference", placeholder()),
            ("notes", text(self.notes)),
        ])
    }
}

#[derive(Debug, Deserialize)]
struct OfferingRecord {
    service_date: Option<String>,
    service_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    amount: f64,
    counted_by: Option<String>,
    notes: Option<String>,
}

impl ModuleRecord for OfferingRecord {
    fn date(&self) -> Option<NaiveDateTime> {
        instant(&self.service_date)
    }

    fn into_row(self) -> Row {
        row([
            ("date", day(&self.service_date)),
            ("service_type", text(self.service_type)),
            ("amount", money(self.amount)),
            ("counted_by", text(self.counted_by)),
            ("notes", text(self.notes)),
        ])
    }
}

#[derive(Debug, Deserialize)]
struct WelfareContributionRecord {
    contribution_date: Option<String>,
    member_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    amount: f64,
    payment_method: Option<String>,
    notes: Option<String>,
}

impl ModuleRecord for WelfareContributionRecord {
    fn date(&self) -> Option<NaiveDateTime> {
        instant(&self.contribution_date)
    }

    fn into_row(self) -> Row {
        row([
            ("date", day(&self.contribution_date)),
            ("kind", label("Contribution")),
            ("person", text(self.member_name)),
            ("amount", money(self.amount)),
            ("details", text(self.notes)),
            ("payment_method", text(self.payment_method)),
        ])
    }
}

#[derive(Debug, Deserialize)]
struct WelfareDisbursementRecord {
    disbursement_date: Option<String>,
    beneficiary_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    amount: f64,
    reason: Option<String>,
}

impl ModuleRecord for WelfareDisbursementRecord {
    fn date(&self) -> Option<NaiveDateTime> {
        instant(&self.disbursement_date)
    }

    fn into_row(self) -> Row {
        row([
            ("date", day(&self.disbursement_date)),
            ("kind", label("Disbursement")),
            ("person", text(self.beneficiary_name)),
            ("amount", money(self.amount)),
            ("details", text(self.reason)),
            ("payment_method", placeholder()),
        ])
    }
}

#[derive(Debug, Deserialize)]
struct ProjectContributionRecord {
    contribution_date: Option<String>,
    project_name: Option<String>,
    contributor_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    amount: f64,
    notes: Option<String>,
}

impl ModuleRecord for ProjectContributionRecord {
    fn date(&self) -> Option<NaiveDateTime> {
        instant(&self.contribution_date)
    }

    fn into_row(self) -> Row {
        row([
            ("date", day(&self.contribution_date)),
            ("kind", label("Contribution")),
            ("project", text(self.project_name)),
            ("party", text(self.contributor_name)),
            ("amount", money(self.amount)),
            ("details", text(self.notes)),
        ])
    }
}

#[derive(Debug, Deserialize)]
struct ProjectExpenseRecord {
    expense_date: Option<String>,
    project_name: Option<String>,
    paid_to: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    amount: f64,
    description: Option<String>,
}

impl ModuleRecord for ProjectExpenseRecord {
    fn date(&self) -> Option<NaiveDateTime> {
        instant(&self.expense_date)
    }

    fn into_row(self) -> Row {
        row([
            ("date", day(&self.expense_date)),
            ("kind", label("Expense")),
            ("project", text(self.project_name)),
            ("party", text(self.paid_to)),
            ("amount", money(self.amount)),
            ("details", text(self.description)),
        ])
    }
}

#[derive(Debug, Deserialize)]
struct ExpenseRecord {
    date_spent: Option<String>,
    category: Option<String>,
    description: Option<String>,
    paid_to: Option<String>,
    approved_by: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    amount: f64,
}

impl ModuleRecord for ExpenseRecord {
    fn date(&self) -> Option<NaiveDateTime> {
        instant(&self.date_spent)
    }

    fn into_row(self) -> Row {
        row([
            ("date", day(&self.date_spent)),
            ("category", text(self.category)),
            ("description", text(self.description)),
            ("paid_to", text(self.paid_to)),
            ("amount", money(self.amount)),
            ("approved_by", text(self.approved_by)),
        ])
    }
}

#[derive(Debug, Deserialize)]
struct PledgePaymentRecord {
    payment_date: Option<String>,
    pledge_title: Option<String>,
    member_name: Option<String>,
    payment_method: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    amount: f64,
}

impl ModuleRecord for PledgePaymentRecord {
    fn date(&self) -> Option<NaiveDateTime> {
        instant(&self.payment_date)
    }

    fn into_row(self) -> Row {
        row([
            ("date", day(&self.payment_date)),
            ("pledge", text(self.pledge_title)),
            ("member", text(self.member_name)),
            ("amount", money(self.amount)),
            ("payment_method", text(self.payment_method)),
        ])
    }
}
