//! Account domain model

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of fractional digits balances and amounts are stored with
pub const MONEY_SCALE: u32 = 2;

/// A customer's bank account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub customer_id: i64,
    pub account_number: String,
    pub iban: String,
    /// Never negative
    pub balance: Decimal,
    /// ISO 4217 currency code, upper-case, fixed at creation
    pub currency_code: String,
    pub opened_at: DateTime<Utc>,
}

/// Fields needed to open a new account; the store assigns the id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub customer_id: i64,
    pub account_number: String,
    pub iban: String,
    pub currency_code: String,
    pub opening_balance: Decimal,
}

impl NewAccount {
    pub fn new(
        customer_id: i64,
        account_number: impl Into<String>,
        iban: &str,
        currency_code: &str,
        opening_balance: Decimal,
    ) -> Self {
        Self {
            customer_id,
            account_number: account_number.into(),
            iban: Account::normalize_iban(iban),
            currency_code: Account::normalize_currency(currency_code),
            opening_balance,
        }
    }

    /// Validate account data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.account_number.trim().is_empty() {
            return Err("account number cannot be empty");
        }
        if !Account::is_valid_iban(&self.iban) {
            return Err("IBAN is malformed");
        }
        if !Account::is_valid_currency(&self.currency_code) {
            return Err("currency must be a three-letter ISO 4217 code");
        }
        if self.opening_balance.is_sign_negative() {
            return Err("opening balance cannot be negative");
        }
        if self.opening_balance.normalize().scale() > MONEY_SCALE {
            return Err("opening balance has more than two fractional digits");
        }
        Ok(())
    }
}

impl Account {
    /// Normalize an IBAN: strip whitespace, upper-case
    pub fn normalize_iban(iban: &str) -> String {
        iban.chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase()
    }

    /// Normalize currency code to uppercase
    pub fn normalize_currency(currency: &str) -> String {
        currency.trim().to_uppercase()
    }

    /// Shape check only: country code, check digits, 10-30 alphanumerics
    pub fn is_valid_iban(iban: &str) -> bool {
        static IBAN_RE: OnceLock<Regex> = OnceLock::new();
        let re = IBAN_RE.get_or_init(|| {
            Regex::new(r"^[A-Z]{2}[0-9]{2}[A-Z0-9]{10,30}$").expect("static IBAN regex")
        });
        re.is_match(iban)
    }

    pub fn is_valid_currency(currency: &str) -> bool {
        currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase())
    }
}
