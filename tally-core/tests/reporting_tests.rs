//! Reporting scenarios against the in-memory collection store
//!
//! Run with: cargo test --test reporting_tests -- --nocapture

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;

use tally_core::adapters::memory::MemoryCollections;
use tally_core::clock::FixedClock;
use tally_core::config::Config;
use tally_core::domain::source::all_sources;
use tally_core::domain::{Domain, FailurePolicy, ResolutionMode};
use tally_core::{Error, ExportRequest, TallyContext, TenantId};

// ============================================================================
// Test Helpers
// ============================================================================

const TENANT: &str = "grace-chapel";

fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32, ms: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_milli_opt(h, min, s, ms)
        .unwrap()
}

fn tenant() -> TenantId {
    TenantId::resolve(Some(TENANT)).unwrap()
}

fn context_with(store: Arc<MemoryCollections>, policy: FailurePolicy) -> TallyContext {
    let config = Config {
        failure_policy: policy,
        ..Config::default()
    };
    let clock = FixedClock::new(at(2024, 6, 15, 10, 30, 0, 0));
    TallyContext::with_store(config, store, Arc::new(clock))
}

fn context(store: Arc<MemoryCollections>) -> TallyContext {
    context_with(store, FailurePolicy::Abort)
}

async fn seed_year(store: &MemoryCollections) {
    let t = tenant();
    for month in 1..=12u32 {
        let d = |day: u32| format!("2024-{month:02}-{day:02}");
        let m = month as f64;
        store.insert("tithes", &t, json!({"giving_date": d(7), "amount": 100.0 + m})).await.unwrap();
        store.insert("tithe_aggregates", &t, json!({"service_date": d(14), "total_amount": 40.5})).await.unwrap();
        store.insert("service_offerings", &t, json!({"service_date": d(21), "amount": 12.25 * m})).await.unwrap();
        store.insert("pledge_payments", &t, json!({"payment_date": d(3), "amount": "25"})).await.unwrap();
        store.insert("expenses", &t, json!({"date_spent": d(10), "amount": 60.0})).await.unwrap();
        store.insert("welfare_disbursements", &t, json!({"disbursement_date": d(18), "amount": 15.0})).await.unwrap();
        store.insert("attendance", &t, json!({"service_date": d(21), "total_attendance": 80 + month})).await.unwrap();
    }
    for (name, joined) in [("Ama", "2024-02-04"), ("Kofi", "2024-02-25"), ("Esi", "2024-09-01")] {
        store.insert("members", &t, json!({"first_name": name, "join_date": joined})).await.unwrap();
    }
    // Last second of the year is inside, first instant of the next is not.
    store.insert("expenses", &t, json!({"date_spent": "2024-12-31T23:59:59.999", "amount": 1.0})).await.unwrap();
    store.insert("expenses", &t, json!({"date_spent": "2025-01-01", "amount": 1000.0})).await.unwrap();
}

// ============================================================================
// KPI Tests
// ============================================================================

#[tokio::test]
async fn test_kpi_compares_with_previous_period() {
    let store = Arc::new(MemoryCollections::new());
    let t = tenant();
    store.insert("tithes", &t, json!({"giving_date": "2024-01-05", "amount": 100})).await.unwrap();
    store.insert("tithes", &t, json!({"giving_date": "2023-12-10", "amount": 50})).await.unwrap();

    let ctx = context(store);
    let kpis = ctx
        .compute_kpis(Some(TENANT), Some("2024-01-01"), Some("2024-01-31"), ResolutionMode::DayBounds)
        .await
        .unwrap();

    assert_eq!(kpis.period.period_start, at(2024, 1, 1, 0, 0, 0, 0));
    assert_eq!(kpis.period.period_end, at(2024, 1, 31, 23, 59, 59, 999));
    assert_eq!(kpis.period.prev_end, at(2023, 12, 31, 23, 59, 59, 999));
    assert_eq!(kpis.period.prev_start, at(2023, 12, 1, 0, 0, 0, 0));

    let income = kpis.metric("income").unwrap();
    assert_eq!(income.current, 100.0);
    assert_eq!(income.previous, 50.0);
    assert_eq!(income.change_pct, 100.0);

    let surplus = kpis.metric("surplus").unwrap();
    assert_eq!(surplus.current, 100.0);
    assert_eq!(surplus.previous, 50.0);
}

#[tokio::test]
async fn test_kpi_rejects_out_of_range_years_before_querying() {
    let store = Arc::new(MemoryCollections::new());
    let ctx = context(store);

    for from in ["-262143-01-01", "0000-01-01"] {
        let err = ctx
            .compute_kpis(Some(TENANT), Some(from), Some("2024-01-01"), ResolutionMode::DayBounds)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDate(_)), "{from}");
    }

    let widest = ctx
        .compute_kpis(Some(TENANT), Some("0001-01-01"), Some("9999-12-31"), ResolutionMode::DayBounds)
        .await
        .unwrap();
    assert!(widest.period.prev_end < widest.period.period_start);
}

#[tokio::test]
async fn test_offset_timestamps_count_on_their_wall_clock_day() {
    let store = Arc::new(MemoryCollections::new());
    let t = tenant();
    store
        .insert("tithes", &t, json!({"giving_date": "2024-01-31T22:00:00-05:00", "amount": 10}))
        .await
        .unwrap();
    store
        .insert("tithes", &t, json!({"giving_date": "2024-02-01T01:00:00+02:00", "amount": 5}))
        .await
        .unwrap();

    let ctx = context(store);
    let kpis = ctx
        .compute_kpis(Some(TENANT), Some("2024-01-01"), Some("2024-01-31"), ResolutionMode::DayBounds)
        .await
        .unwrap();
    assert_eq!(kpis.metric("income").unwrap().current, 10.0);
}

#[tokio::test]
async fn test_kpi_covers_expenses_and_auxiliary_counters() {
    let store = Arc::new(MemoryCollections::new());
    seed_year(&store).await;

    let ctx = context(store);
    let kpis = ctx
        .compute_kpis(Some(TENANT), Some("2024-02-01"), Some("2024-02-29"), ResolutionMode::DayBounds)
        .await
        .unwrap();

    let expense = kpis.metric("expense").unwrap();
    assert_eq!(expense.current, 75.0);
    assert_eq!(expense.previous, 75.0);
    assert_eq!(expense.change_pct, 0.0);

    let members = kpis.metric("new_members").unwrap();
    assert_eq!(members.current, 2.0);
    assert_eq!(members.previous, 0.0);
    assert_eq!(members.change_pct, 100.0);

    let attendance = kpis.metric("attendance").unwrap();
    assert_eq!(attendance.current, 82.0);
    assert_eq!(attendance.previous, 81.0);
    assert!(kpis.source_errors.is_empty());
}

#[tokio::test]
async fn test_kpi_default_window_follows_the_clock() {
    let ctx = context(Arc::new(MemoryCollections::new()));

    let day_bounds = ctx
        .compute_kpis(Some(TENANT), None, None, ResolutionMode::DayBounds)
        .await
        .unwrap();
    assert_eq!(day_bounds.period.period_start, at(2024, 6, 1, 0, 0, 0, 0));
    assert_eq!(day_bounds.period.period_end, at(2024, 6, 15, 23, 59, 59, 999));

    let until_now = ctx
        .compute_kpis(Some(TENANT), None, None, ResolutionMode::UntilNow)
        .await
        .unwrap();
    assert_eq!(until_now.period.period_end, at(2024, 6, 15, 10, 30, 0, 0));
}

#[tokio::test]
async fn test_previous_window_matches_duration_without_overlap() {
    let ctx = context(Arc::new(MemoryCollections::new()));
    let ranges = [
        ("2024-01-01", "2024-01-31"),
        ("2024-03-01", "2024-03-01"),
        ("2024-02-10", "2024-05-20"),
        ("2023-01-01", "2023-12-31"),
    ];
    for (from, to) in ranges {
        let kpis = ctx
            .compute_kpis(Some(TENANT), Some(from), Some(to), ResolutionMode::DayBounds)
            .await
            .unwrap();
        let p = &kpis.period;
        assert!(p.prev_end < p.period_start, "{from}..{to} overlaps");
        assert_eq!(
            p.prev_end - p.prev_start,
            p.period_end - p.period_start,
            "{from}..{to} duration differs"
        );
    }
}

#[tokio::test]
async fn test_amounts_never_negative_with_non_negative_inputs() {
    let store = Arc::new(MemoryCollections::new());
    seed_year(&store).await;
    store
        .insert("income_entries", &tenant(), json!({"entry_date": "2024-04-02", "amount": "not a number"}))
        .await
        .unwrap();

    let ctx = context(store);
    let kpis = ctx
        .compute_kpis(Some(TENANT), Some("2024-01-01"), Some("2024-12-31"), ResolutionMode::DayBounds)
        .await
        .unwrap();
    assert!(kpis.metric("income").unwrap().current >= 0.0);
    assert!(kpis.metric("expense").unwrap().current >= 0.0);
}

// ============================================================================
// Series Tests
// ============================================================================

#[tokio::test]
async fn test_single_offering_series() {
    let store = Arc::new(MemoryCollections::new());
    store
        .insert("service_offerings", &tenant(), json!({"service_date": "2024-03-10", "amount": 40}))
        .await
        .unwrap();

    let ctx = context(store);
    let series = ctx.compute_series(Some(TENANT), Some("2024")).await.unwrap();

    assert_eq!(series.points.len(), 12);
    for (index, point) in series.points.iter().enumerate() {
        assert_eq!(point.month.year, 2024);
        assert_eq!(point.month.month, index as u32 + 1);
        for (metric, value) in &point.values {
            let expected = match (point.month.month, metric.as_str()) {
                (3, "offering" | "income" | "surplus") => 40.0,
                _ => 0.0,
            };
            assert_eq!(*value, expected, "{} {metric}", point.month);
        }
    }
    assert!(series.points[2].values.contains_key("tithe"));
    assert!(series.points[2].values.contains_key("new_members"));
}

#[tokio::test]
async fn test_series_reconciles_with_domain_totals() {
    let store = Arc::new(MemoryCollections::new());
    seed_year(&store).await;

    let ctx = context(store);
    let series = ctx.compute_series(Some(TENANT), None).await.unwrap();
    let kpis = ctx
        .compute_kpis(Some(TENANT), Some("2024-01-01"), Some("2024-12-31"), ResolutionMode::DayBounds)
        .await
        .unwrap();

    for metric in ["income", "expense", "surplus", "new_members", "attendance"] {
        let from_series = series.total(metric);
        let from_kpis = kpis.metric(metric).unwrap().current;
        assert!(
            (from_series - from_kpis).abs() < 1e-6,
            "{metric}: series {from_series} vs total {from_kpis}"
        );
    }

    let per_source: f64 = Domain::Income
        .sources()
        .iter()
        .map(|s| series.total(s.key))
        .sum();
    assert!((per_source - series.total("income")).abs() < 1e-6);
}

#[tokio::test]
async fn test_series_rejects_bad_year() {
    let ctx = context(Arc::new(MemoryCollections::new()));
    let err = ctx.compute_series(Some(TENANT), Some("20x4")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidDate(_)));
}

// ============================================================================
// Failure Policy Tests
// ============================================================================

#[tokio::test]
async fn test_abort_policy_fails_whole_computation() {
    let store = Arc::new(MemoryCollections::new());
    seed_year(&store).await;
    store.fail_collection("service_offerings").await;

    let ctx = context_with(store, FailurePolicy::Abort);
    let err = ctx
        .compute_kpis(Some(TENANT), Some("2024-01-01"), Some("2024-01-31"), ResolutionMode::DayBounds)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UpstreamQuery { ref source_key, .. } if source_key == "offering"));

    let err = ctx.compute_series(Some(TENANT), Some("2024")).await.unwrap_err();
    assert!(matches!(err, Error::UpstreamQuery { .. }));
}

#[tokio::test]
async fn test_isolate_policy_reports_failed_sources() {
    let store = Arc::new(MemoryCollections::new());
    seed_year(&store).await;
    store.fail_collection("service_offerings").await;

    let ctx = context_with(store, FailurePolicy::Isolate);
    let kpis = ctx
        .compute_kpis(Some(TENANT), Some("2024-01-01"), Some("2024-01-31"), ResolutionMode::DayBounds)
        .await
        .unwrap();

    // tithe 101 + aggregate 40.5 + pledge 25, offering missing
    assert_eq!(kpis.metric("income").unwrap().current, 166.5);
    assert_eq!(kpis.source_errors.len(), 1);
    assert_eq!(kpis.source_errors[0].source_key, "offering");

    let series = ctx.compute_series(Some(TENANT), Some("2024")).await.unwrap();
    assert_eq!(series.total("offering"), 0.0);
    assert_eq!(series.source_errors.len(), 1);

    let json = serde_json::to_value(&kpis).unwrap();
    assert_eq!(json["sourceErrors"][0]["sourceKey"], "offering");
}

// ============================================================================
// Report & Export Tests
// ============================================================================

#[tokio::test]
async fn test_members_report_fills_placeholders() {
    let store = Arc::new(MemoryCollections::new());
    let t = tenant();
    store
        .insert("members", &t, json!({"first_name": "Kwame", "last_name": "Asante", "email": "kwame@example.org", "join_date": "2023-05-14"}))
        .await
        .unwrap();
    store
        .insert("members", &t, json!({"first_name": "Abena", "last_name": "Owusu"}))
        .await
        .unwrap();

    let ctx = context(store);
    let report = ctx.build_report(Some(TENANT), "members", None, None).await.unwrap();

    assert_eq!(report.rows.len(), 2);
    for row in &report.rows {
        for column in &report.available_columns {
            assert!(row.contains_key(&column.key), "missing {}", column.key);
        }
    }
    assert_eq!(report.rows[0]["name"], "Abena Owusu");
    assert_eq!(report.rows[0]["email"], "—");
    assert_eq!(report.rows[1]["email"], "kwame@example.org");
    assert_eq!(report.rows[1]["join_date"], "2023-05-14");
}

#[tokio::test]
async fn test_reports_are_tenant_scoped() {
    let store = Arc::new(MemoryCollections::new());
    let other = TenantId::resolve(Some("other-church")).unwrap();
    store.insert("expenses", &tenant(), json!({"date_spent": "2024-01-02", "amount": 5})).await.unwrap();
    store.insert("expenses", &other, json!({"date_spent": "2024-01-02", "amount": 500})).await.unwrap();

    let ctx = context(store);
    let report = ctx.build_report(Some(TENANT), "expenses", None, None).await.unwrap();
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0]["amount"], json!(5.0));
}

#[tokio::test]
async fn test_validation_happens_before_any_query() {
    let store = Arc::new(MemoryCollections::new());
    for source in all_sources() {
        store.fail_collection(source.collection).await;
    }
    store.fail_collection("members").await;
    let ctx = context(store);

    let request = ExportRequest {
        tenant: Some(TENANT),
        module: "tithes",
        format: "csv",
        ..ExportRequest::default()
    };
    assert!(matches!(
        ctx.build_and_export_report(&request).await,
        Err(Error::UnsupportedFormat(_))
    ));

    let request = ExportRequest {
        module: "payroll",
        format: "pdf",
        ..request
    };
    assert!(matches!(
        ctx.build_and_export_report(&request).await,
        Err(Error::UnsupportedModule(_))
    ));

    assert!(matches!(
        ctx.build_report(Some("  "), "members", None, None).await,
        Err(Error::MissingTenantContext)
    ));
    assert!(matches!(
        ctx.compute_kpis(Some(TENANT), Some("2024-02-01"), Some("2024-01-01"), ResolutionMode::DayBounds)
            .await,
        Err(Error::InvalidRange { .. })
    ));
}

#[tokio::test]
async fn test_export_projects_requested_columns() {
    let store = Arc::new(MemoryCollections::new());
    store
        .insert("service_offerings", &tenant(), json!({"service_date": "2024-04-07", "amount": 640, "counted_by": "Deacon Mensah"}))
        .await
        .unwrap();
    let ctx = context(store);

    let request = ExportRequest {
        tenant: Some(TENANT),
        module: "offerings",
        format: "pdf",
        fields: Some("counted_by, date, unknown"),
        ..ExportRequest::default()
    };
    let file = ctx.build_and_export_report(&request).await.unwrap();
    assert_eq!(file.file_name, "offerings-report-2024-06-15.txt");

    let text = String::from_utf8(file.bytes).unwrap();
    let counted = text.find("Counted By").unwrap();
    let date = text.find("Date").unwrap();
    assert!(counted < date);
    assert!(text.contains("Deacon Mensah"));
    assert!(!text.contains("Amount"));

    let request = ExportRequest {
        fields: Some("unknown"),
        format: "excel",
        ..request
    };
    let file = ctx.build_and_export_report(&request).await.unwrap();
    assert!(file.file_name.ends_with(".xlsx"));
    assert!(!file.bytes.is_empty());
}
