//! Output formatting utilities

use chrono::{DateTime, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use rust_decimal::Decimal;

use novabank_core::services::{Delivery, OtpIssued};
use novabank_core::OtpPurpose;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_money(amount: Decimal, currency: &str) -> String {
    format!("{:.2} {}", amount, currency)
}

/// Report where a one-time code went
pub fn code_sent(issued: &OtpIssued) {
    let kind = match issued.purpose {
        OtpPurpose::Registration => "verification",
        OtpPurpose::PasswordReset => "password reset",
    };
    match &issued.delivery {
        Delivery::Delivered => info(&format!(
            "A {} code was sent to {}. It expires at {}.",
            kind,
            issued.email,
            format_time(&issued.expires_at)
        )),
        Delivery::Failed { reason } => warning(&format!(
            "The code for {} could not be delivered ({}). Request a new one to try again.",
            issued.email, reason
        )),
    }
}
