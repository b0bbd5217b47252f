//! Account ledger - balance rules for a single account

use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::Account;
use crate::ports::AccountRepository;

/// Applies signed balance changes without ever letting a balance go negative
#[derive(Debug, Default, Clone, Copy)]
pub struct AccountLedger;

impl AccountLedger {
    pub fn new() -> Self {
        Self
    }

    /// Add `delta` to the account balance and return the updated account
    ///
    /// The write itself is guarded (`balance + delta >= 0`), so a concurrent
    /// change between the read and the update cannot overdraw the account.
    pub fn apply_delta<R: AccountRepository + ?Sized>(
        &self,
        accounts: &R,
        account_id: i64,
        delta: Decimal,
    ) -> Result<Account> {
        let account = accounts
            .get_account_by_id(account_id)?
            .ok_or_else(|| Error::not_found(format!("account {}", account_id)))?;

        let insufficient = |balance: Decimal| Error::InsufficientFunds {
            account_id,
            balance,
            requested: -delta,
        };

        if account.balance + delta < Decimal::ZERO {
            return Err(insufficient(account.balance));
        }

        accounts
            .apply_balance_delta(account_id, delta)?
            .ok_or_else(|| insufficient(account.balance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewAccount;
    use chrono::Utc;
    use std::cell::RefCell;

    struct OneAccount {
        account: RefCell<Account>,
    }

    impl OneAccount {
        fn with_balance(balance: Decimal) -> Self {
            Self {
                account: RefCell::new(Account {
                    id: 1,
                    customer_id: 7,
                    account_number: "0001".to_string(),
                    iban: "TR330006100519786457841326".to_string(),
                    balance,
                    currency_code: "TRY".to_string(),
                    opened_at: Utc::now(),
                }),
            }
        }
    }

    impl AccountRepository for OneAccount {
        fn get_account_by_id(&self, id: i64) -> Result<Option<Account>> {
            let account = self.account.borrow();
            Ok((account.id == id).then(|| account.clone()))
        }

        fn get_account_by_iban(&self, _iban: &str) -> Result<Option<Account>> {
            Ok(None)
        }

        fn get_accounts_by_customer(&self, _customer_id: i64) -> Result<Vec<Account>> {
            Ok(vec![self.account.borrow().clone()])
        }

        fn add_account(&self, _account: &NewAccount) -> Result<Account> {
            unimplemented!()
        }

        fn apply_balance_delta(&self, id: i64, delta: Decimal) -> Result<Option<Account>> {
            let mut account = self.account.borrow_mut();
            if account.id != id || account.balance + delta < Decimal::ZERO {
                return Ok(None);
            }
            account.balance += delta;
            Ok(Some(account.clone()))
        }
    }

    #[test]
    fn test_debit_and_credit() {
        let repo = OneAccount::with_balance(Decimal::new(500, 0));
        let ledger = AccountLedger::new();

        let after = ledger.apply_delta(&repo, 1, Decimal::new(-200, 0)).unwrap();
        assert_eq!(after.balance, Decimal::new(300, 0));

        let after = ledger.apply_delta(&repo, 1, Decimal::new(1050, 2)).unwrap();
        assert_eq!(after.balance, Decimal::new(31050, 2));
    }

    #[test]
    fn test_debit_to_exactly_zero_is_allowed() {
        let repo = OneAccount::with_balance(Decimal::new(100, 0));
        let after = AccountLedger::new().apply_delta(&repo, 1, Decimal::new(-100, 0)).unwrap();
        assert_eq!(after.balance, Decimal::ZERO);
    }

    #[test]
    fn test_overdraw_is_rejected_without_change() {
        let repo = OneAccount::with_balance(Decimal::new(100, 0));
        let result = AccountLedger::new().apply_delta(&repo, 1, Decimal::new(-10000, 0));

        match result {
            Err(Error::InsufficientFunds { account_id, balance, requested }) => {
                assert_eq!(account_id, 1);
                assert_eq!(balance, Decimal::new(100, 0));
                assert_eq!(requested, Decimal::new(10000, 0));
            }
            other => panic!("expected InsufficientFunds, got {:?}", other),
        }
        assert_eq!(repo.account.borrow().balance, Decimal::new(100, 0));
    }

    #[test]
    fn test_missing_account() {
        let repo = OneAccount::with_balance(Decimal::ZERO);
        let result = AccountLedger::new().apply_delta(&repo, 42, Decimal::ONE);
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
