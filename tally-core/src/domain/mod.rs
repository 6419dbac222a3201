//! Core domain values
//!
//! Request-scoped value objects and the pure functions over them. No I/O
//! happens in this module.

pub mod change;
pub mod failure;
pub mod kpi;
pub mod period;
pub mod report;
pub mod result;
pub mod series;
pub mod source;
mod tenant;

pub use change::change_pct;
pub use failure::{FailurePolicy, SourceFailure};
pub use kpi::{KpiResult, KpiValue};
pub use period::{MonthKey, Period, ResolutionMode, ResolvedPeriod};
pub use report::{Column, ExportView, Report, Row};
pub use series::{MonthTotals, Series, SeriesPoint};
pub use source::{AuxiliaryMetric, Domain, Measure, SourceDescriptor};
pub use tenant::TenantId;
