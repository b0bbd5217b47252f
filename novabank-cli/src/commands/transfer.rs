//! Transfer command - move money between two accounts

use anyhow::Result;
use colored::Colorize;
use rust_decimal::Decimal;

use super::execute;
use crate::output::{self, format_money};
use novabank_core::services::TransferRequest;

pub fn run(
    from: i64,
    to: &str,
    amount: Decimal,
    description: &str,
    user: Option<i64>,
    json: bool,
) -> Result<()> {
    let request = TransferRequest::new(from, to, amount, description);

    execute(
        "transfer",
        json,
        |ctx| {
            let actor = match user {
                Some(id) => ctx.local_actor().with_user(id),
                None => ctx.local_actor(),
            };
            ctx.transfer(&actor, &request)
        },
        |receipt| {
            output::success(&format!(
                "Transferred {} from account {} to account {}",
                format_money(receipt.amount, &receipt.currency_code),
                receipt.source_account_id,
                receipt.destination_account_id
            ));
            println!(
                "  New balance: {}",
                format_money(receipt.source_balance_after, &receipt.currency_code).bold()
            );
            println!("  Reference:   {}", receipt.correlation_id.to_string().dimmed());
        },
    )
}
