//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the Store/Session ports
//! - stderr and HTTP webhook for the Notifier port

pub mod duckdb;
pub mod notifier;
