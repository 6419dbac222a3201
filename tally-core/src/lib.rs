//! Tally Core - financial reporting for multi-tenant organizations
//!
//! This crate implements the reporting engine following hexagonal architecture:
//!
//! - **domain**: Periods, source registry, KPI/series/report values
//! - **ports**: Trait definitions for external collaborators (CollectionStore, writers)
//! - **services**: Summation fan-out, series, KPIs, module reports, export
//! - **adapters**: Concrete implementations (DuckDB, in-memory, text document, XLSX)

pub mod adapters;
pub mod clock;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::document::TextDocumentWriter;
use adapters::duckdb::DuckDbCollections;
use adapters::spreadsheet::XlsxWorkbookWriter;
use clock::{Clock, SystemClock};
use config::Config;
use domain::period::{parse_year, ResolutionMode};
use domain::report::parse_fields;
use ports::CollectionStore;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult, Result};
pub use domain::{KpiResult, Report, Series, TenantId};
pub use services::{ExportFile, ExportFormat, ModuleKey};

/// Parameters of an export request, as received from the caller
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportRequest<'a> {
    pub tenant: Option<&'a str>,
    pub module: &'a str,
    pub format: &'a str,
    pub from: Option<&'a str>,
    pub to: Option<&'a str>,
    /// Comma-separated column keys
    pub fields: Option<&'a str>,
}

/// Main context for Tally operations
///
/// Holds the configuration, the collection store and every service. The
/// public operations take raw request parameters and validate them before
/// touching the store.
pub struct TallyContext {
    pub config: Config,
    pub store: Arc<dyn CollectionStore>,
    pub clock: Arc<dyn Clock>,
    pub kpi_service: KpiService,
    pub series_service: SeriesService,
    pub report_service: ReportService,
    pub export_service: ExportService,
    database: Option<Arc<DuckDbCollections>>,
}

impl TallyContext {
    /// Open the DuckDB database in `dir` and wire the services
    pub fn new(dir: &Path) -> anyhow::Result<Self> {
        let config = Config::load(dir)?;
        std::fs::create_dir_all(dir)?;

        let db_path = dir.join(&config.database_file);
        let database = Arc::new(DuckDbCollections::new(&db_path)?);
        database.ensure_schema()?;

        let store: Arc<dyn CollectionStore> = database.clone();
        let mut context = Self::with_store(config, store, Arc::new(SystemClock));
        context.database = Some(database);
        Ok(context)
    }

    /// Wire the services over any store and clock
    pub fn with_store(config: Config, store: Arc<dyn CollectionStore>, clock: Arc<dyn Clock>) -> Self {
        let engine = Arc::new(SummationEngine::new(Arc::clone(&store)));

        let kpi_service = KpiService::new(Arc::clone(&engine), Arc::clone(&clock), config.failure_policy);
        let series_service =
            SeriesService::new(Arc::clone(&engine), Arc::clone(&clock), config.failure_policy);
        let report_service = ReportService::new(Arc::clone(&store), config.row_limit);
        let export_service = ExportService::new(
            Arc::new(TextDocumentWriter::new(config.rows_per_page)),
            Arc::new(XlsxWorkbookWriter::new()),
            Arc::clone(&clock),
        );

        Self {
            config,
            store,
            clock,
            kpi_service,
            series_service,
            report_service,
            export_service,
            database: None,
        }
    }

    /// Demo seeding is only available on the DuckDB-backed context
    pub fn demo_service(&self) -> Option<DemoService> {
        self.database.as_ref().map(|db| DemoService::new(Arc::clone(db)))
    }

    pub async fn compute_kpis(
        &self,
        tenant: Option<&str>,
        from: Option<&str>,
        to: Option<&str>,
        mode: ResolutionMode,
    ) -> Result<KpiResult> {
        let tenant = TenantId::resolve(tenant)?;
        self.kpi_service.compute_kpis(&tenant, from, to, mode).await
    }

    pub async fn compute_series(&self, tenant: Option<&str>, year: Option<&str>) -> Result<Series> {
        let tenant = TenantId::resolve(tenant)?;
        let year = year.map(parse_year).transpose()?;
        self.series_service.compute_series(&tenant, year).await
    }

    pub async fn build_report(
        &self,
        tenant: Option<&str>,
        module: &str,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Report> {
        let tenant = TenantId::resolve(tenant)?;
        let module = ModuleKey::parse(module)?;
        let range = report_range(from, to, self.clock.now())?;
        self.report_service.build_report(module, &tenant, range).await
    }

    /// Build a module report and render it
    ///
    /// Every parameter is validated first; no bytes are produced unless the
    /// report was fully built.
    pub async fn build_and_export_report(&self, request: &ExportRequest<'_>) -> Result<ExportFile> {
        let tenant = TenantId::resolve(request.tenant)?;
        let module = ModuleKey::parse(request.module)?;
        let format = ExportFormat::parse(request.format)?;
        let range = report_range(request.from, request.to, self.clock.now())?;
        let fields = parse_fields(request.fields);

        let report = self.report_service.build_report(module, &tenant, range).await?;
        self.export_service.export(module, &report, format, &fields)
    }
}
