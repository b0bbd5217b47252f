//! Transfer engine - moves money between two accounts as one atomic unit

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Actor, AuditAction, Transaction, MONEY_SCALE};
use crate::ports::{atomically, read, Clock, Store};
use crate::services::{AccountLedger, AccountLocks, AuditTrail};

/// A request to move `amount` from one of the caller's accounts to an IBAN
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: i64,
    pub target_iban: String,
    pub amount: Decimal,
    pub description: String,
}

impl TransferRequest {
    pub fn new(
        from_account_id: i64,
        target_iban: impl Into<String>,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self {
            from_account_id,
            target_iban: target_iban.into(),
            amount,
            description: description.into(),
        }
    }

    /// Checks that need no store access
    fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(Error::validation("transfer amount must be greater than zero"));
        }
        if self.amount.normalize().scale() > MONEY_SCALE {
            return Err(Error::validation(
                "transfer amount cannot have more than two fractional digits",
            ));
        }
        if self.target_iban.trim().is_empty() {
            return Err(Error::validation("target IBAN cannot be empty"));
        }
        if !Account::is_valid_iban(&Account::normalize_iban(&self.target_iban)) {
            return Err(Error::validation("target IBAN is malformed"));
        }
        Ok(())
    }
}

/// Outcome of a committed transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub correlation_id: Uuid,
    pub debit_transaction_id: Uuid,
    pub credit_transaction_id: Uuid,
    pub source_account_id: i64,
    pub destination_account_id: i64,
    pub amount: Decimal,
    pub currency_code: String,
    pub source_balance_after: Decimal,
    pub destination_balance_after: Decimal,
    pub timestamp: DateTime<Utc>,
}

pub struct TransferService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    audit: Arc<AuditTrail>,
    ledger: AccountLedger,
    locks: AccountLocks,
}

impl TransferService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, audit: Arc<AuditTrail>) -> Self {
        Self {
            store,
            clock,
            audit,
            ledger: AccountLedger::new(),
            locks: AccountLocks::new(),
        }
    }

    /// Move money from `request.from_account_id` to the account holding
    /// `request.target_iban`
    ///
    /// Both balance changes, both transaction rows and the audit entry commit
    /// together or not at all.
    pub fn transfer(&self, actor: &Actor, request: &TransferRequest) -> Result<TransferReceipt> {
        request.validate()?;

        let (source, destination) = self.resolve(request)?;

        if source.id == destination.id {
            return Err(Error::SelfTransfer);
        }
        if source.currency_code != destination.currency_code {
            return Err(Error::CurrencyMismatch {
                source_currency: source.currency_code,
                target_currency: destination.currency_code,
            });
        }

        let result = self.locks.with_locked(&[source.id, destination.id], || {
            atomically(self.store.as_ref(), |session| {
                let amount = request.amount;
                let now = self.clock.now();
                let correlation_id = Uuid::new_v4();

                let debited = self.ledger.apply_delta(session, source.id, -amount)?;
                let credited = self.ledger.apply_delta(session, destination.id, amount)?;

                let description = request.description.trim();
                let debit = Transaction::debit(
                    correlation_id,
                    debited.id,
                    &credited.iban,
                    amount,
                    description,
                    debited.balance,
                    now,
                );
                let credit = Transaction::credit(
                    correlation_id,
                    credited.id,
                    &debited.iban,
                    amount,
                    description,
                    credited.balance,
                    now,
                );
                session.add_transaction(&debit)?;
                session.add_transaction(&credit)?;

                self.audit.append(
                    session,
                    actor,
                    AuditAction::Transfer,
                    format!(
                        "{:.2} {} from {} to {} (ref {})",
                        amount,
                        debited.currency_code,
                        debited.account_number,
                        credited.account_number,
                        correlation_id
                    ),
                )?;

                Ok(TransferReceipt {
                    correlation_id,
                    debit_transaction_id: debit.id,
                    credit_transaction_id: credit.id,
                    source_account_id: debited.id,
                    destination_account_id: credited.id,
                    amount,
                    currency_code: debited.currency_code,
                    source_balance_after: debited.balance,
                    destination_balance_after: credited.balance,
                    timestamp: now,
                })
            })
        });

        match &result {
            Ok(receipt) => tracing::info!(
                correlation_id = %receipt.correlation_id,
                source = receipt.source_account_id,
                destination = receipt.destination_account_id,
                "transfer committed"
            ),
            Err(Error::Persistence(detail)) => {
                tracing::error!(
                    source = source.id,
                    destination = destination.id,
                    "transfer rolled back: {}",
                    detail
                );
                self.audit.record_detached(
                    actor,
                    AuditAction::TransferFailed,
                    format!(
                        "{:.2} {} from {} to {} rolled back",
                        request.amount,
                        source.currency_code,
                        source.account_number,
                        destination.account_number
                    ),
                );
            }
            Err(_) => {}
        }

        result
    }

    /// Look up both ends in a short read session, released before any lock is taken
    fn resolve(&self, request: &TransferRequest) -> Result<(Account, Account)> {
        read(self.store.as_ref(), |session| {
            let source = session
                .get_account_by_id(request.from_account_id)?
                .ok_or_else(|| {
                    Error::not_found(format!("source account {}", request.from_account_id))
                })?;
            let destination = session
                .get_account_by_iban(&request.target_iban)?
                .ok_or_else(|| Error::not_found("no account with the target IBAN"))?;
            Ok((source, destination))
        })
    }
}
