//! Migrations for the operational log database (`logs.duckdb`)

/// Schema migrations for the log database, as `(file name, sql)`
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
