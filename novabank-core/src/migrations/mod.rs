//! Bank database migrations
//!
//! SQL files are embedded with `include_str!` and applied in name order.
//! Add new files as `NNN_description.sql` and list them below.

/// Schema migrations for the bank database, as `(file name, sql)`
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
