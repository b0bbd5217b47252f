//! NovaBank Core - transactional banking core
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Account, Transaction, User, OtpChallenge, AuditLog)
//! - **ports**: Trait definitions for external dependencies (Store, Notifier, Clock)
//! - **services**: Business logic (transfer engine, ledger, OTP auth, audit trail)
//! - **adapters**: Concrete implementations (DuckDB, console and webhook notifiers)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::duckdb::DuckDbStore;
use adapters::notifier::{ConsoleNotifier, WebhookNotifier};
use config::{Config, NotifierKind};
use ports::{Clock, Notifier, Store, SystemClock};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, ErrorKind, OperationResult, Result};
pub use domain::{Account, Actor, AuditAction, AuditLog, NewAccount, OtpPurpose, Transaction, User};

/// Main context for NovaBank operations
///
/// The single place where the store, notifier and clock are chosen and the
/// services are wired together.
pub struct NovaBankContext {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub audit: Arc<AuditTrail>,
    pub accounts: AccountService,
    pub transfers: TransferService,
    pub auth: AuthService,
}

impl NovaBankContext {
    /// Open `novabank.duckdb` in `data_dir` using the settings found there
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        std::fs::create_dir_all(data_dir)?;

        let store = DuckDbStore::open(&data_dir.join("novabank.duckdb"))?;
        store.ensure_schema()?;

        let notifier: Arc<dyn Notifier> = match config.notifier {
            NotifierKind::Console => Arc::new(ConsoleNotifier::new()),
            NotifierKind::Webhook => {
                let url = config.webhook_url.as_deref().ok_or_else(|| {
                    Error::validation("notifier.webhookUrl is required for the webhook notifier")
                })?;
                Arc::new(WebhookNotifier::new(url)?)
            }
        };

        Ok(Self::with_parts(config, Arc::new(store), notifier, Arc::new(SystemClock)))
    }

    /// Wire the services around explicit parts (tests, embedding hosts)
    pub fn with_parts(
        config: Config,
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let audit = Arc::new(AuditTrail::new(Arc::clone(&store), Arc::clone(&clock)));
        let accounts = AccountService::new(Arc::clone(&store), Arc::clone(&audit));
        let transfers = TransferService::new(Arc::clone(&store), Arc::clone(&clock), Arc::clone(&audit));
        let auth = AuthService::new(
            Arc::clone(&store),
            notifier,
            clock,
            Arc::clone(&audit),
            OtpAuthenticator::new(config.otp_ttl()),
            PasswordService::new(config.password),
        );

        Self {
            config,
            store,
            audit,
            accounts,
            transfers,
            auth,
        }
    }

    /// Actor for operations started on this machine
    pub fn local_actor(&self) -> Actor {
        Actor::new(None, self.config.audit_ip_address.clone())
    }

    // === Core operations ===

    pub fn open_account(&self, actor: &Actor, account: &NewAccount) -> Result<Account> {
        self.accounts.open_account(actor, account)
    }

    pub fn get_accounts_for_customer(&self, customer_id: i64) -> Result<Vec<Account>> {
        self.accounts.get_accounts_for_customer(customer_id)
    }

    pub fn get_transaction_history(&self, account_id: i64) -> Result<Vec<Transaction>> {
        self.accounts.get_transaction_history(account_id)
    }

    pub fn transfer(&self, actor: &Actor, request: &TransferRequest) -> Result<TransferReceipt> {
        self.transfers.transfer(actor, request)
    }

    /// Audit entries, newest first; `None` returns all of them
    pub fn list_audit_logs(&self, limit: Option<usize>) -> Result<Vec<AuditLog>> {
        match limit {
            Some(limit) => self.audit.list_recent(limit),
            None => self.audit.list_all(),
        }
    }
}
