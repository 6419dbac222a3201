//! End-to-end tests over a real DuckDB file
//!
//! Run with: cargo test --test duckdb_tests -- --nocapture

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use tally_core::adapters::duckdb::DuckDbCollections;
use tally_core::domain::{Period, ResolutionMode};
use tally_core::ports::{CollectionStore, DateFilter, FindQuery, Record, SortOrder};
use tally_core::{ExportRequest, TallyContext, TenantId};

fn records(values: Vec<serde_json::Value>) -> Vec<Record> {
    values
        .into_iter()
        .map(|v| match v {
            serde_json::Value::Object(map) => map,
            _ => panic!("records must be objects"),
        })
        .collect()
}

fn tenant(id: &str) -> TenantId {
    TenantId::resolve(Some(id)).unwrap()
}

#[tokio::test]
async fn test_aggregates_over_real_tables() {
    let temp_dir = TempDir::new().unwrap();
    let store = DuckDbCollections::new(&temp_dir.path().join("test.duckdb")).unwrap();
    store.ensure_schema().unwrap();

    let t = tenant("grace-chapel");
    let other = tenant("other");
    store
        .insert_records(
            "tithes",
            &t,
            &records(vec![
                json!({"giving_date": "2024-01-05", "amount": 100.0, "member_name": "Ama"}),
                json!({"giving_date": "2024-01-31 23:59:59.999", "amount": 20.0}),
                json!({"giving_date": "2024-02-01", "amount": 7.0}),
                json!({"giving_date": "2024-03-03", "amount": null}),
            ]),
        )
        .unwrap();
    store
        .insert_records("tithes", &other, &records(vec![json!({"giving_date": "2024-01-05", "amount": 900.0})]))
        .unwrap();

    let january = Period::days(
        chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    )
    .unwrap();
    let sum = store
        .sum_where("tithes", &t, "giving_date", "amount", &january)
        .await
        .unwrap();
    assert_eq!(sum, 120.0);

    let year = Period::calendar_year(2024).unwrap();
    let count = store.count_where("tithes", &t, "giving_date", &year).await.unwrap();
    assert_eq!(count, 4);

    let months = store
        .group_by_month("tithes", &t, "giving_date", tally_core::domain::Measure::Sum("amount"), &year)
        .await
        .unwrap();
    let values: Vec<(String, f64)> = months.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    assert_eq!(
        values,
        vec![
            ("2024-01".to_string(), 120.0),
            ("2024-02".to_string(), 7.0),
            ("2024-03".to_string(), 0.0),
        ]
    );

    let query = FindQuery {
        collection: "tithes",
        date_filter: Some(DateFilter {
            attribute: "giving_date",
            period: january,
        }),
        sort: Some(SortOrder {
            attribute: "giving_date",
            descending: true,
        }),
        limit: 10,
    };
    let found = store.find_where(&t, &query).await.unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[1]["member_name"], "Ama");
    assert!(found[1]["giving_date"].as_str().unwrap().starts_with("2024-01-05"));
}

#[tokio::test]
async fn test_offset_timestamps_keep_their_wall_clock_day() {
    let store = DuckDbCollections::in_memory().unwrap();
    store.ensure_schema().unwrap();
    let t = tenant("t");
    store
        .insert_records(
            "service_offerings",
            &t,
            &records(vec![
                json!({"service_date": "2024-01-31T22:00:00-05:00", "amount": 10.0}),
                json!({"service_date": "2024-02-01T01:00:00+02:00", "amount": 5.0}),
            ]),
        )
        .unwrap();

    let january = Period::days(
        chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    )
    .unwrap();
    let sum = store
        .sum_where("service_offerings", &t, "service_date", "amount", &january)
        .await
        .unwrap();
    assert_eq!(sum, 10.0);
}

#[tokio::test]
async fn test_unregistered_collection_is_upstream_failure() {
    let store = DuckDbCollections::in_memory().unwrap();
    let year = Period::calendar_year(2024).unwrap();
    let err = store
        .sum_where("no_such_table", &tenant("t"), "d", "a", &year)
        .await
        .unwrap_err();
    assert!(matches!(err, tally_core::Error::UpstreamQuery { .. }));

    let err = store
        .sum_where("tithes; DROP TABLE tithes", &tenant("t"), "giving_date", "amount", &year)
        .await
        .unwrap_err();
    assert!(!err.is_validation());
}

#[tokio::test]
async fn test_context_end_to_end_with_demo_data() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = TallyContext::new(temp_dir.path()).unwrap();
    let demo = ctx.demo_service().unwrap();
    demo.seed(&tenant("demo"), 2024).unwrap();

    let kpis = ctx
        .compute_kpis(Some("demo"), Some("2024-03-01"), Some("2024-03-31"), ResolutionMode::DayBounds)
        .await
        .unwrap();
    assert!(kpis.metric("income").unwrap().current > 0.0);
    assert!(kpis.metric("attendance").unwrap().current > 0.0);

    let series = ctx.compute_series(Some("demo"), Some("2024")).await.unwrap();
    assert_eq!(series.points.len(), 12);
    let year_kpis = ctx
        .compute_kpis(Some("demo"), Some("2024-01-01"), Some("2024-12-31"), ResolutionMode::DayBounds)
        .await
        .unwrap();
    let income = year_kpis.metric("income").unwrap().current;
    assert!((series.total("income") - income).abs() < 1e-6);

    let report = ctx.build_report(Some("demo"), "welfare", None, None).await.unwrap();
    assert_eq!(report.rows.len(), 24);

    let request = ExportRequest {
        tenant: Some("demo"),
        module: "tithes",
        format: "excel",
        ..ExportRequest::default()
    };
    let file = ctx.build_and_export_report(&request).await.unwrap();
    assert_eq!(&file.bytes[..2], b"PK");

    // Other tenants see nothing.
    let empty = ctx.build_report(Some("someone-else"), "members", None, None).await.unwrap();
    assert!(empty.rows.is_empty());
}

#[tokio::test]
async fn test_reopening_keeps_data_and_skips_migrations() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tally.duckdb");
    let t = tenant("t");
    {
        let store = DuckDbCollections::new(&path).unwrap();
        let first = store.run_migrations().unwrap();
        assert!(!first.applied.is_empty());
        store
            .insert_records("expenses", &t, &records(vec![json!({"date_spent": "2024-05-01", "amount": 42.0})]))
            .unwrap();
    }

    let store = Arc::new(DuckDbCollections::new(&path).unwrap());
    let second = store.run_migrations().unwrap();
    assert!(second.applied.is_empty());

    let year = Period::calendar_year(2024).unwrap();
    let total = store.sum_where("expenses", &t, "date_spent", "amount", &year).await.unwrap();
    assert_eq!(total, 42.0);
}
