//! Database migrations - embedded SQL files
//!
//! Migrations are compiled into the binary at build time using include_str!.
//! Each migration is a tuple of (name, sql_content).
//! Migrations are sorted by name and applied in order.

/// All migrations, embedded at compile time.
/// Format: (filename, sql_content)
///
/// When adding a new migration, create NNN_description.sql and add it here in order.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_income_collections.sql", include_str!("001_income_collections.sql")),
    ("002_expense_collections.sql", include_str!("002_expense_collections.sql")),
    ("003_membership_collections.sql", include_str!("003_membership_collections.sql")),
];
