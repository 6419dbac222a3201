//! Migration service - creates and upgrades the collection tables
//!
//! Migrations are SQL files embedded at compile time and recorded in
//! sys_migrations, so running them twice is a no-op.

use std::collections::HashSet;

use anyhow::{Context, Result};
use duckdb::Connection;

use crate::migrations::MIGRATIONS;

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationResult {
    /// Names of newly applied migrations
    pub applied: Vec<String>,
    /// Count of migrations that were already applied
    pub already_applied: usize,
}

pub struct MigrationService<'a> {
    conn: &'a Connection,
}

impl<'a> MigrationService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Apply every migration not yet recorded, in name order
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let applied_before: HashSet<String> = if self.migrations_table_exists()? {
            self.get_applied()?.into_iter().collect()
        } else {
            HashSet::new()
        };

        let mut applied = Vec::new();
        for (name, sql) in MIGRATIONS {
            if applied_before.contains(*name) {
                continue;
            }
            self.conn
                .execute_batch(sql)
                .with_context(|| format!("Failed to apply migration {name}"))?;
            self.conn
                .execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [*name])?;
            tracing::info!(migration = %name, "Applied migration");
            applied.push(name.to_string());
        }

        Ok(MigrationResult {
            applied,
            already_applied: applied_before.len(),
        })
    }

    fn migrations_table_exists(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Names of migrations already recorded
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(names.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::{all_sources, AUXILIARY_METRICS};

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn);

        let first = service.run_pending().unwrap();
        assert_eq!(first.applied.len(), MIGRATIONS.len());
        assert_eq!(first.applied[0], "000_migrations.sql");
        assert_eq!(first.already_applied, 0);

        let second = service.run_pending().unwrap();
        assert!(second.applied.is_empty());
        assert_eq!(second.already_applied, MIGRATIONS.len());
    }

    #[test]
    fn test_every_registered_collection_has_a_table() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationService::new(&conn).run_pending().unwrap();

        let collections = all_sources()
            .map(|s| s.collection)
            .chain(AUXILIARY_METRICS.iter().map(|m| m.collection));
        for collection in collections {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
                    [collection],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table for {collection}");
        }
    }
}
