//! Audit command - the business audit trail

use anyhow::Result;

use super::execute;
use crate::output::{create_table, format_time};
use novabank_core::AuditLog;

pub fn run(limit: Option<usize>, json: bool) -> Result<()> {
    execute("audit", json, |ctx| ctx.list_audit_logs(limit), |logs| print_logs(logs))
}

fn print_logs(logs: &[AuditLog]) {
    if logs.is_empty() {
        println!("No audit entries found.");
        return;
    }

    let mut table = create_table();
    table.set_header(vec!["Time", "Action", "User", "IP", "Details"]);
    for log in logs {
        table.add_row(vec![
            format_time(&log.timestamp),
            log.action.to_string(),
            log.user_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
            log.ip_address.clone(),
            log.details.clone(),
        ]);
    }
    println!("{}", table);
}
