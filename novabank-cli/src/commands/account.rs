//! Account command - open accounts and list a customer's accounts

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use rust_decimal::Decimal;

use super::execute;
use crate::output::{self, create_table, format_money, format_time};
use novabank_core::{Account, NewAccount};

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account with an opening balance
    Open {
        /// Owning customer id
        #[arg(long)]
        customer: i64,
        /// Bank account number
        #[arg(long)]
        number: String,
        /// IBAN (spaces allowed)
        #[arg(long)]
        iban: String,
        /// ISO 4217 currency code
        #[arg(long, default_value = "TRY")]
        currency: String,
        /// Opening balance
        #[arg(long, default_value = "0")]
        balance: Decimal,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the accounts of a customer
    List {
        /// Customer id
        #[arg(long)]
        customer: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: AccountCommands) -> Result<()> {
    match command {
        AccountCommands::Open {
            customer,
            number,
            iban,
            currency,
            balance,
            json,
        } => {
            let account = NewAccount::new(customer, number, &iban, &currency, balance);
            execute(
                "account open",
                json,
                |ctx| ctx.open_account(&ctx.local_actor(), &account),
                |opened| {
                    output::success(&format!(
                        "Opened account {} ({}) with {}",
                        opened.id,
                        opened.iban,
                        format_money(opened.balance, &opened.currency_code)
                    ))
                },
            )
        }
        AccountCommands::List { customer, json } => execute(
            "account list",
            json,
            |ctx| ctx.get_accounts_for_customer(customer),
            |accounts| print_accounts(customer, accounts),
        ),
    }
}

fn print_accounts(customer: i64, accounts: &[Account]) {
    if accounts.is_empty() {
        println!("Customer {} has no accounts.", customer);
        return;
    }

    println!("{}", format!("Accounts of customer {}", customer).bold());
    let mut table = create_table();
    table.set_header(vec!["Id", "Number", "IBAN", "Balance", "Opened"]);
    for account in accounts {
        table.add_row(vec![
            account.id.to_string(),
            account.account_number.clone(),
            account.iban.clone(),
            format_money(account.balance, &account.currency_code),
            format_time(&account.opened_at),
        ]);
    }
    println!("{}", table);
}
