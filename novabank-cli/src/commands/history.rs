//! History command - ledger entries of one account

use anyhow::Result;
use colored::Colorize;

use super::execute;
use crate::output::{create_table, format_time};
use novabank_core::Transaction;

pub fn run(account_id: i64, json: bool) -> Result<()> {
    execute(
        "history",
        json,
        |ctx| ctx.get_transaction_history(account_id),
        |rows| print_history(account_id, rows),
    )
}

fn print_history(account_id: i64, rows: &[Transaction]) {
    if rows.is_empty() {
        println!("No transactions for account {}.", account_id);
        return;
    }

    let mut table = create_table();
    table.set_header(vec!["Time", "Amount", "Balance", "Counterparty", "Description"]);
    for row in rows {
        let amount = if row.is_debit() {
            format!("{:.2}", row.amount).red().to_string()
        } else {
            format!("+{:.2}", row.amount).green().to_string()
        };
        table.add_row(vec![
            format_time(&row.timestamp),
            amount,
            format!("{:.2}", row.balance_after),
            row.counterparty_iban.clone(),
            row.description.clone(),
        ]);
    }
    println!("{}", table);
}
