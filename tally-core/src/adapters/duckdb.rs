//! DuckDB collection store
//!
//! Each collection is a table with `id`, `tenant_id`, `created_at` and its
//! own attributes (see migrations). Aggregates run as single SQL statements.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::{Connection, ToSql};
use regex::Regex;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::domain::change::finite_or_zero;
use crate::domain::result::{Error, Result};
use crate::domain::{Measure, MonthKey, MonthTotals, Period, TenantId};
use crate::ports::{CollectionStore, FindQuery, Record};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Table and column names are interpolated into SQL, so they must be plain identifiers.
fn identifier(name: &str) -> Result<&str> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("identifier pattern is valid"));
    if pattern.is_match(name) {
        Ok(name)
    } else {
        Err(Error::database(format!("invalid identifier: {name:?}")))
    }
}

/// Amount expression that treats non-numeric and non-finite values as 0
fn amount_expr(column: &str) -> String {
    format!(
        "CASE WHEN isfinite(TRY_CAST({column} AS DOUBLE)) THEN TRY_CAST({column} AS DOUBLE) ELSE 0.0 END"
    )
}

fn measure_expr(measure: Measure) -> Result<String> {
    Ok(match measure {
        Measure::Sum(attribute) => format!("COALESCE(SUM({}), 0.0)", amount_expr(identifier(attribute)?)),
        Measure::Count => "CAST(COUNT(*) AS DOUBLE)".to_string(),
    })
}

fn bound(instant: NaiveDateTime) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

/// `WHERE` clause shared by the range queries; binds tenant, start, end.
fn range_clause(table: &str, date_column: &str) -> String {
    format!(
        "FROM {table} WHERE tenant_id = ? AND {date_column} BETWEEN CAST(? AS TIMESTAMP) AND CAST(? AS TIMESTAMP)"
    )
}

/// DuckDB-backed collections
pub struct DuckDbCollections {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl DuckDbCollections {
    /// Open (or create) a database file
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which can occur when another process holds the database open.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Arc::new(Mutex::new(conn)),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            error = %err_msg,
                            "Database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// In-memory database (tests, one-off runs)
    pub fn in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off: cached extensions may not match the bundled build
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::database("connection lock poisoned"))
    }

    /// Run database migrations, returning what was applied
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn)
            .run_pending()
            .map_err(|e| Error::database(format!("migration failed: {e:#}")))
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Insert records into a collection for one tenant, in a single transaction
    ///
    /// Records without an `id` get a fresh UUID.
    pub fn insert_records(&self, collection: &str, tenant: &TenantId, records: &[Record]) -> Result<usize> {
        let table = identifier(collection)?;
        let conn = self.lock()?;
        conn.execute_batch("BEGIN TRANSACTION")?;

        let result = (|| -> Result<usize> {
            for record in records {
                let mut columns = vec!["id", "tenant_id"];
                let id = record
                    .get("id")
                    .and_then(JsonValue::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                let mut params: Vec<Box<dyn ToSql>> =
                    vec![Box::new(id), Box::new(tenant.to_string())];

                for (key, value) in record {
                    if key == "id" || key == "tenant_id" {
                        continue;
                    }
                    columns.push(identifier(key)?);
                    params.push(json_to_param(value));
                }

                let placeholders = vec!["?"; columns.len()].join(", ");
                let sql = format!(
                    "INSERT INTO {table} ({}) VALUES ({placeholders})",
                    columns.join(", ")
                );
                let param_refs: Vec<&dyn ToSql> = params.iter().map(|b| b.as_ref()).collect();
                conn.execute(&sql, param_refs.as_slice())?;
            }
            Ok(records.len())
        })();

        match result {
            Ok(count) => {
                conn.execute_batch("COMMIT")?;
                Ok(count)
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Run blocking DuckDB work off the async runtime
    async fn blocking<T, F>(&self, collection: &str, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let outcome = tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| Error::database("connection lock poisoned"))?;
            work(&guard)
        })
        .await
        .map_err(|e| Error::upstream(collection, format!("query task failed: {e}")))?;

        outcome.map_err(|e| match e {
            Error::Database(message) => Error::upstream(collection, message),
            other => other,
        })
    }
}

/// Convert JSON value to DuckDB parameter
fn json_to_param(value: &JsonValue) -> Box<dyn ToSql> {
    match value {
        JsonValue::Null => Box::new(None::<String>),
        JsonValue::Bool(b) => Box::new(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Box::new(i)
            } else {
                Box::new(n.as_f64().unwrap_or(0.0))
            }
        }
        // Offsets are dropped so TIMESTAMP columns hold wall-clock time.
        JsonValue::String(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => Box::new(dt.naive_local().format("%Y-%m-%d %H:%M:%S%.3f").to_string()),
            Err(_) => Box::new(s.clone()),
        },
        other => Box::new(other.to_string()),
    }
}

fn column_value(row: &duckdb::Row, idx: usize) -> JsonValue {
    match row.get_ref(idx) {
        Ok(ValueRef::Null) => JsonValue::Null,
        Ok(ValueRef::Boolean(b)) => JsonValue::Bool(b),
        Ok(ValueRef::TinyInt(i)) => serde_json::json!(i),
        Ok(ValueRef::SmallInt(i)) => serde_json::json!(i),
        Ok(ValueRef::Int(i)) => serde_json::json!(i),
        Ok(ValueRef::BigInt(i)) => serde_json::json!(i),
        Ok(ValueRef::HugeInt(i)) => serde_json::json!(i.to_string()),
        Ok(ValueRef::UTinyInt(i)) => serde_json::json!(i),
        Ok(ValueRef::USmallInt(i)) => serde_json::json!(i),
        Ok(ValueRef::UInt(i)) => serde_json::json!(i),
        Ok(ValueRef::UBigInt(i)) => serde_json::json!(i),
        Ok(ValueRef::Float(f)) => serde_json::json!(finite_or_zero(f as f64)),
        Ok(ValueRef::Double(f)) => serde_json::json!(finite_or_zero(f)),
        Ok(ValueRef::Decimal(d)) => {
            let s = d.to_string();
            match s.parse::<f64>() {
                Ok(f) => serde_json::json!(f),
                Err(_) => JsonValue::String(s),
            }
        }
        Ok(ValueRef::Text(bytes)) => JsonValue::String(String::from_utf8_lossy(bytes).to_string()),
        Ok(ValueRef::Date32(days)) => NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days as i64)))
            .map(|d| JsonValue::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(JsonValue::Null),
        Ok(ValueRef::Timestamp(unit, value)) => {
            let micros = match unit {
                TimeUnit::Second => value.saturating_mul(1_000_000),
                TimeUnit::Millisecond => value.saturating_mul(1_000),
                TimeUnit::Microsecond => value,
                TimeUnit::Nanosecond => value / 1_000,
            };
            DateTime::from_timestamp_micros(micros)
                .map(|dt| JsonValue::String(dt.naive_utc().format("%Y-%m-%dT%H:%M:%S%.3f").to_string()))
                .unwrap_or(JsonValue::Null)
        }
        _ => JsonValue::Null,
    }
}

#[async_trait]
impl CollectionStore for DuckDbCollections {
    async fn sum_where(
        &self,
        collection: &str,
        tenant: &TenantId,
        date_attribute: &str,
        amount_attribute: &str,
        period: &Period,
    ) -> Result<f64> {
        let sql = format!(
            "SELECT COALESCE(SUM({}), 0.0) {}",
            amount_expr(identifier(amount_attribute)?),
            range_clause(identifier(collection)?, identifier(date_attribute)?)
        );
        let params = [tenant.to_string(), bound(period.start), bound(period.end)];

        self.blocking(collection, move |conn| {
            let total: f64 = conn.query_row(&sql, duckdb::params_from_iter(params.iter()), |row| row.get(0))?;
            Ok(finite_or_zero(total))
        })
        .await
    }

    async fn count_where(
        &self,
        collection: &str,
        tenant: &TenantId,
        date_attribute: &str,
        period: &Period,
    ) -> Result<u64> {
        let sql = format!(
            "SELECT COUNT(*) {}",
            range_clause(identifier(collection)?, identifier(date_attribute)?)
        );
        let params = [tenant.to_string(), bound(period.start), bound(period.end)];

        self.blocking(collection, move |conn| {
            let count: i64 = conn.query_row(&sql, duckdb::params_from_iter(params.iter()), |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    async fn group_by_month(
        &self,
        collection: &str,
        tenant: &TenantId,
        date_attribute: &str,
        measure: Measure,
        period: &Period,
    ) -> Result<MonthTotals> {
        let date_column = identifier(date_attribute)?;
        let sql = format!(
            "SELECT CAST(year({date_column}) AS INTEGER), CAST(month({date_column}) AS INTEGER), {} {} GROUP BY 1, 2",
            measure_expr(measure)?,
            range_clause(identifier(collection)?, date_column)
        );
        let params = [tenant.to_string(), bound(period.start), bound(period.end)];

        self.blocking(collection, move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(duckdb::params_from_iter(params.iter()), |row| {
                Ok((row.get::<_, i32>(0)?, row.get::<_, i32>(1)?, row.get::<_, f64>(2)?))
            })?;

            let mut totals = MonthTotals::new();
            for row in rows {
                let (year, month, value) = row?;
                if let Some(key) = MonthKey::new(year, month as u32) {
                    *totals.entry(key).or_insert(0.0) += finite_or_zero(value);
                }
            }
            Ok(totals)
        })
        .await
    }

    async fn find_where(&self, tenant: &TenantId, query: &FindQuery<'_>) -> Result<Vec<Record>> {
        let table = identifier(query.collection)?;
        let mut sql = format!("SELECT * FROM {table} WHERE tenant_id = ?");
        let mut params = vec![tenant.to_string()];

        if let Some(filter) = query.date_filter {
            let column = identifier(filter.attribute)?;
            sql.push_str(&format!(
                " AND {column} BETWEEN CAST(? AS TIMESTAMP) AND CAST(? AS TIMESTAMP)"
            ));
            params.push(bound(filter.period.start));
            params.push(bound(filter.period.end));
        }
        if let Some(sort) = query.sort {
            let direction = if sort.descending { "DESC" } else { "ASC" };
            sql.push_str(&format!(" ORDER BY {} {direction} NULLS LAST", identifier(sort.attribute)?));
        }
        sql.push_str(&format!(" LIMIT {}", query.limit));

        self.blocking(query.collection, move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut result_rows = stmt.query(duckdb::params_from_iter(params.iter()))?;

            let mut rows: Vec<Vec<JsonValue>> = Vec::new();
            let mut column_count = 0;
            while let Some(row) = result_rows.next()? {
                if rows.is_empty() {
                    column_count = row.as_ref().column_count();
                }
                rows.push((0..column_count).map(|i| column_value(row, i)).collect());
            }

            // Release the borrow on stmt before reading column names
            drop(result_rows);

            let columns: Vec<String> = (0..column_count)
                .map(|i| {
                    stmt.column_name(i)
                        .map(|s| s.to_string())
                        .unwrap_or_else(|_| format!("col{}", i))
                })
                .collect();

            Ok(rows
                .into_iter()
                .map(|values| columns.iter().cloned().zip(values).collect::<Record>())
                .collect())
        })
        .await
    }
}
