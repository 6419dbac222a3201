//! Source registry
//!
//! Every collection that feeds a domain total is listed here once, with the
//! attribute holding its date and the attribute holding its amount. Adding a
//! source is one new entry; nothing else needs to change.

use serde::Serialize;

/// A group of sources that are summed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Income,
    Expense,
}

impl Domain {
    pub fn key(self) -> &'static str {
        match self {
            Domain::Income => "income",
            Domain::Expense => "expense",
        }
    }

    pub fn sources(self) -> &'static [SourceDescriptor] {
        match self {
            Domain::Income => INCOME_SOURCES,
            Domain::Expense => EXPENSE_SOURCES,
        }
    }
}

/// What is aggregated for each matching record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    /// Sum of a numeric attribute (missing or non-finite counts as 0)
    Sum(&'static str),
    /// Number of records
    Count,
}

/// One collection contributing to a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceDescriptor {
    /// Series key, unique across the registry
    pub key: &'static str,
    pub label: &'static str,
    pub collection: &'static str,
    pub date_attribute: &'static str,
    pub amount_attribute: &'static str,
}

impl SourceDescriptor {
    pub const fn new(
        key: &'static str,
        label: &'static str,
        collection: &'static str,
        date_attribute: &'static str,
        amount_attribute: &'static str,
    ) -> Self {
        Self {
            key,
            label,
            collection,
            date_attribute,
            amount_attribute,
        }
    }

    pub fn measure(&self) -> Measure {
        Measure::Sum(self.amount_attribute)
    }
}

pub const INCOME_SOURCES: &[SourceDescriptor] = &[
    SourceDescriptor::new("tithe", "Tithes", "tithes", "giving_date", "amount"),
    SourceDescriptor::new(
        "tithe_aggregate",
        "Aggregate tithes",
        "tithe_aggregates",
        "service_date",
        "total_amount",
    ),
    SourceDescriptor::new("offering", "Service offerings", "service_offerings", "service_date", "amount"),
    SourceDescriptor::new("special_fund", "Special funds", "special_funds", "giving_date", "amount"),
    SourceDescriptor::new(
        "welfare_contribution",
        "Welfare contributions",
        "welfare_contributions",
        "contribution_date",
        "amount",
    ),
    SourceDescriptor::new(
        "project_contribution",
        "Project contributions",
        "project_contributions",
        "contribution_date",
        "amount",
    ),
    SourceDescriptor::new("business_income", "Business income", "business_income", "income_date", "amount"),
    SourceDescriptor::new("event_offering", "Event offerings", "event_offerings", "event_date", "amount"),
    SourceDescriptor::new("group_offering", "Small-group offerings", "group_offerings", "meeting_date", "amount"),
    SourceDescriptor::new(
        "department_offering",
        "Department offerings",
        "department_offerings",
        "offering_date",
        "amount",
    ),
    SourceDescriptor::new("pledge_payment", "Pledge payments", "pledge_payments", "payment_date", "amount"),
    SourceDescriptor::new("other_income", "Other income", "income_entries", "entry_date", "amount"),
];

pub const EXPENSE_SOURCES: &[SourceDescriptor] = &[
    SourceDescriptor::new("general_expense", "General expenses", "expenses", "date_spent", "amount"),
    SourceDescriptor::new(
        "welfare_disbursement",
        "Welfare disbursements",
        "welfare_disbursements",
        "disbursement_date",
        "amount",
    ),
    SourceDescriptor::new("project_expense", "Project expenses", "project_expenses", "expense_date", "amount"),
    SourceDescriptor::new(
        "business_expense",
        "Business expenses",
        "business_expenses",
        "expense_date",
        "amount",
    ),
    SourceDescriptor::new("other_expense", "Other expenses", "expense_entries", "entry_date", "amount"),
];

/// A counter reported next to the domain totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxiliaryMetric {
    pub key: &'static str,
    pub collection: &'static str,
    pub date_attribute: &'static str,
    pub measure: Measure,
}

pub const NEW_MEMBERS: AuxiliaryMetric = AuxiliaryMetric {
    key: "new_members",
    collection: "members",
    date_attribute: "join_date",
    measure: Measure::Count,
};

pub const ATTENDANCE: AuxiliaryMetric = AuxiliaryMetric {
    key: "attendance",
    collection: "attendance",
    date_attribute: "service_date",
    measure: Measure::Sum("total_attendance"),
};

pub const AUXILIARY_METRICS: &[AuxiliaryMetric] = &[NEW_MEMBERS, ATTENDANCE];

/// All domain sources, income first.
pub fn all_sources() -> impl Iterator<Item = &'static SourceDescriptor> {
    INCOME_SOURCES.iter().chain(EXPENSE_SOURCES.iter())
}
