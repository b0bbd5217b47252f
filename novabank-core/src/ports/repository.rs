//! Repository ports - persistence abstraction
//!
//! Repositories expose storage only; balance and authentication rules live in
//! the services. Every repository call happens inside a [`Session`], and a
//! session's writes become visible together on [`Session::commit`].

use rust_decimal::Decimal;

use crate::domain::result::Result;
use crate::domain::{
    Account, AuditLog, NewAccount, NewAuditLog, NewUser, OtpChallenge, OtpPurpose, Transaction,
    User,
};

/// Account storage
pub trait AccountRepository {
    /// Get account by ID
    fn get_account_by_id(&self, id: i64) -> Result<Option<Account>>;

    /// Get account by (normalized) IBAN
    fn get_account_by_iban(&self, iban: &str) -> Result<Option<Account>>;

    /// Get all accounts of a customer, ordered by id
    fn get_accounts_by_customer(&self, customer_id: i64) -> Result<Vec<Account>>;

    /// Insert a new account and return it with its assigned id
    fn add_account(&self, account: &NewAccount) -> Result<Account>;

    /// Add `delta` to the balance in a single guarded statement
    ///
    /// Returns `None` when the account does not exist or when the new
    /// balance would be negative; nothing is written in that case.
    fn apply_balance_delta(&self, id: i64, delta: Decimal) -> Result<Option<Account>>;
}

/// Transaction (ledger entry) storage
pub trait TransactionRepository {
    /// Insert a transaction row
    fn add_transaction(&self, tx: &Transaction) -> Result<()>;

    /// Get transactions for an account, newest first
    fn get_transactions_by_account(&self, account_id: i64) -> Result<Vec<Transaction>>;
}

/// User storage
pub trait UserRepository {
    fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Insert a new user (unverified) and return it with its assigned id
    fn add_user(&self, user: &NewUser, password_hash: &str) -> Result<User>;

    /// Persist `password_hash`, `is_verified` and `is_active` of an existing user
    fn update_user(&self, user: &User) -> Result<()>;
}

/// One-time code storage, keyed by `(email, purpose)`
pub trait OtpRepository {
    /// Store a challenge, replacing any previous one for the same key
    fn upsert_challenge(&self, challenge: &OtpChallenge) -> Result<()>;

    fn get_challenge(&self, email: &str, purpose: OtpPurpose) -> Result<Option<OtpChallenge>>;
}

/// Append-only audit storage
pub trait AuditRepository {
    fn add_audit_log(&self, entry: &NewAuditLog) -> Result<AuditLog>;

    /// Audit rows, newest first; `None` returns everything
    fn get_audit_logs(&self, limit: Option<usize>) -> Result<Vec<AuditLog>>;
}

/// A unit of work against the store
///
/// Dropping a session without calling [`Session::commit`] rolls back every
/// write made through it.
pub trait Session:
    AccountRepository + TransactionRepository + UserRepository + OtpRepository + AuditRepository
{
    fn commit(self: Box<Self>) -> Result<()>;
}

/// Session factory
pub trait Store: Send + Sync {
    /// Start a new store transaction
    fn begin(&self) -> Result<Box<dyn Session + '_>>;
}

/// Run `work` in a fresh session and commit it if `work` succeeds
///
/// Any error from `work` or from the commit leaves the store untouched.
pub fn atomically<T>(store: &dyn Store, work: impl FnOnce(&dyn Session) -> Result<T>) -> Result<T> {
    let session = store.begin()?;
    let value = work(session.as_ref())?;
    session.commit()?;
    Ok(value)
}

/// Run read-only `work` in a session that is always rolled back
pub fn read<T>(store: &dyn Store, work: impl FnOnce(&dyn Session) -> Result<T>) -> Result<T> {
    let session = store.begin()?;
    work(session.as_ref())
}
