//! Service layer - reporting orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on one public operation or the machinery behind it.

mod demo;
mod export;
mod kpi;
pub mod migration;
pub mod report;
mod series;
pub mod summation;

pub use demo::{DemoService, SeedSummary};
pub use export::{ExportFile, ExportFormat, ExportService};
pub use kpi::KpiService;
pub use migration::{MigrationResult, MigrationService};
pub use report::{report_range, ModuleKey, ReportService};
pub use series::SeriesService;
pub use summation::{Settlement, SourceOutcome, SummationEngine};
