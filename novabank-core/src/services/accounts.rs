//! Account service - opening accounts and read-only account queries

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Actor, AuditAction, NewAccount, Transaction};
use crate::ports::{atomically, read, Store};
use crate::services::AuditTrail;

pub struct AccountService {
    store: Arc<dyn Store>,
    audit: Arc<AuditTrail>,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, audit: Arc<AuditTrail>) -> Self {
        Self { store, audit }
    }

    /// Open an account with an opening balance
    pub fn open_account(&self, actor: &Actor, account: &NewAccount) -> Result<Account> {
        account.validate().map_err(Error::validation)?;

        let opened = atomically(self.store.as_ref(), |session| {
            if session.get_account_by_iban(&account.iban)?.is_some() {
                return Err(Error::validation(format!(
                    "an account with IBAN {} already exists",
                    account.iban
                )));
            }
            let opened = session.add_account(account)?;
            self.audit.append(
                session,
                actor,
                AuditAction::OpenAccount,
                format!(
                    "account {} ({}) for customer {} with {:.2} {}",
                    opened.account_number,
                    opened.iban,
                    opened.customer_id,
                    opened.balance,
                    opened.currency_code
                ),
            )?;
            Ok(opened)
        })?;

        tracing::info!(account_id = opened.id, customer_id = opened.customer_id, "account opened");
        Ok(opened)
    }

    pub fn get_account(&self, account_id: i64) -> Result<Account> {
        read(self.store.as_ref(), |session| session.get_account_by_id(account_id))?
            .ok_or_else(|| Error::not_found(format!("account {}", account_id)))
    }

    /// Accounts of a customer, oldest first
    pub fn get_accounts_for_customer(&self, customer_id: i64) -> Result<Vec<Account>> {
        read(self.store.as_ref(), |session| session.get_accounts_by_customer(customer_id))
    }

    /// Ledger entries of an account, newest first
    pub fn get_transaction_history(&self, account_id: i64) -> Result<Vec<Transaction>> {
        read(self.store.as_ref(), |session| {
            if session.get_account_by_id(account_id)?.is_none() {
                return Err(Error::not_found(format!("account {}", account_id)));
            }
            session.get_transactions_by_account(account_id)
        })
    }
}
