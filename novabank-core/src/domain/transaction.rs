//! Transaction domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One leg of a transfer, as recorded against a single account
///
/// Rows are written once by the transfer engine and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: i64,
    /// Shared by the debit and credit legs of one transfer
    pub correlation_id: Uuid,
    pub counterparty_iban: String,
    /// Negative for debits, positive for credits
    pub amount: Decimal,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// Account balance right after this leg was applied
    pub balance_after: Decimal,
}

impl Transaction {
    /// Debit leg: `amount` is the positive transfer amount
    pub fn debit(
        correlation_id: Uuid,
        account_id: i64,
        counterparty_iban: impl Into<String>,
        amount: Decimal,
        description: impl Into<String>,
        balance_after: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            correlation_id,
            counterparty_iban: counterparty_iban.into(),
            amount: -amount,
            description: description.into(),
            timestamp,
            balance_after,
        }
    }

    /// Credit leg: `amount` is the positive transfer amount
    pub fn credit(
        correlation_id: Uuid,
        account_id: i64,
        counterparty_iban: impl Into<String>,
        amount: Decimal,
        description: impl Into<String>,
        balance_after: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            correlation_id,
            counterparty_iban: counterparty_iban.into(),
            amount,
            description: description.into(),
            timestamp,
            balance_after,
        }
    }

    pub fn is_debit(&self) -> bool {
        self.amount.is_sign_negative()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legs_carry_signed_amounts() {
        let correlation = Uuid::new_v4();
        let now = Utc::now();
        let amount = Decimal::new(100, 0);

        let debit = Transaction::debit(correlation, 1, "TR02", amount, "rent", Decimal::new(400, 0), now);
        let credit = Transaction::credit(correlation, 2, "TR01", amount, "rent", Decimal::new(300, 0), now);

        assert_eq!(debit.amount, Decimal::new(-100, 0));
        assert!(debit.is_debit());
        assert_eq!(credit.amount, Decimal::new(100, 0));
        assert!(!credit.is_debit());
        assert_eq!(debit.correlation_id, credit.correlation_id);
        assert_ne!(debit.id, credit.id);
    }
}
