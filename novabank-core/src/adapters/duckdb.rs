//! DuckDB store implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::types::Type;
use duckdb::{params, Connection, Row};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, AuditLog, NewAccount, NewAuditLog, NewUser, OtpChallenge, OtpPurpose, Transaction,
    User,
};
use crate::ports::{
    AccountRepository, AuditRepository, OtpRepository, Session, Store, TransactionRepository,
    UserRepository,
};
use crate::services::MigrationService;

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Timestamps are written in this layout and read back through `::VARCHAR`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const ACCOUNT_COLUMNS: &str = "account_id, customer_id, account_number, iban, balance::VARCHAR,
                               currency_code, opened_at::VARCHAR";

const TRANSACTION_COLUMNS: &str = "transaction_id, account_id, correlation_id, counterparty_iban,
                                   amount::VARCHAR, description, created_at::VARCHAR,
                                   balance_after::VARCHAR";

const USER_COLUMNS: &str = "user_id, username, email, password_hash, role, is_verified,
                            created_at::VARCHAR, is_active";

const OTP_COLUMNS: &str = "subject_email, purpose, code, issued_at::VARCHAR, expires_at::VARCHAR,
                           consumed";

const AUDIT_COLUMNS: &str = "audit_log_id, user_id, action, details, ip_address,
                             created_at::VARCHAR";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB-backed [`Store`]
///
/// A single connection is shared behind a mutex; a session holds the mutex
/// from `BEGIN TRANSACTION` until it commits or is dropped.
pub struct DuckDbStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbStore {
    /// Open (or create) a database file
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which occur when another process still holds the file.
    pub fn open(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            let config = duckdb::Config::default().enable_autoload_extension(false)?;
            match Connection::open_with_flags(db_path, config) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            delay_ms = delay.as_millis() as u64,
                            "database busy, retrying: {}",
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.map(Error::from).unwrap_or_else(|| {
            Error::persistence(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    /// Path of the database file, `None` for in-memory stores
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::persistence(format!("Lock poisoned: {}", e)))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<crate::services::MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Execute raw SQL outside of any session (maintenance only)
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}

impl Store for DuckDbStore {
    fn begin(&self) -> Result<Box<dyn Session + '_>> {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN TRANSACTION")?;
        Ok(Box::new(DuckDbSession {
            conn,
            finished: false,
        }))
    }
}

/// An open DuckDB transaction
pub struct DuckDbSession<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

impl Drop for DuckDbSession<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!("rollback failed: {}", e);
            }
        }
    }
}

impl Session for DuckDbSession<'_> {
    fn commit(mut self: Box<Self>) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }
}

// === Account operations ===

impl AccountRepository for DuckDbSession<'_> {
    fn get_account_by_id(&self, id: i64) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM sys_accounts WHERE account_id = ?", ACCOUNT_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_account(row)?)),
            None => Ok(None),
        }
    }

    fn get_account_by_iban(&self, iban: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM sys_accounts WHERE iban = ?", ACCOUNT_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![Account::normalize_iban(iban)])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_account(row)?)),
            None => Ok(None),
        }
    }

    fn get_accounts_by_customer(&self, customer_id: i64) -> Result<Vec<Account>> {
        let sql = format!(
            "SELECT {} FROM sys_accounts WHERE customer_id = ? ORDER BY account_id",
            ACCOUNT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let accounts = stmt
            .query_map(params![customer_id], row_to_account)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(accounts)
    }

    fn add_account(&self, account: &NewAccount) -> Result<Account> {
        let sql = format!(
            "INSERT INTO sys_accounts (customer_id, account_number, iban, balance, currency_code, opened_at)
             VALUES (?, ?, ?, CAST(? AS DECIMAL(18, 2)), ?, CAST(? AS TIMESTAMP))
             RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![
            account.customer_id,
            account.account_number,
            account.iban,
            account.opening_balance.to_string(),
            account.currency_code,
            format_timestamp(Utc::now()),
        ])?;
        match rows.next()? {
            Some(row) => Ok(row_to_account(row)?),
            None => Err(Error::persistence("account insert returned no row")),
        }
    }

    fn apply_balance_delta(&self, id: i64, delta: Decimal) -> Result<Option<Account>> {
        let sql = format!(
            "UPDATE sys_accounts
             SET balance = balance + CAST(? AS DECIMAL(18, 2))
             WHERE account_id = ? AND balance + CAST(? AS DECIMAL(18, 2)) >= 0
             RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let delta = delta.to_string();
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![delta, id, delta])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_account(row)?)),
            None => Ok(None),
        }
    }
}

// === Transaction operations ===

impl TransactionRepository for DuckDbSession<'_> {
    fn add_transaction(&self, tx: &Transaction) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sys_transactions (transaction_id, account_id, correlation_id, counterparty_iban,
                                           amount, description, created_at, balance_after)
             VALUES (?, ?, ?, ?, CAST(? AS DECIMAL(18, 2)), ?, CAST(? AS TIMESTAMP),
                     CAST(? AS DECIMAL(18, 2)))",
            params![
                tx.id.to_string(),
                tx.account_id,
                tx.correlation_id.to_string(),
                tx.counterparty_iban,
                tx.amount.to_string(),
                tx.description,
                format_timestamp(tx.timestamp),
                tx.balance_after.to_string(),
            ],
        )?;
        Ok(())
    }

    fn get_transactions_by_account(&self, account_id: i64) -> Result<Vec<Transaction>> {
        // rowid breaks ties between legs written in the same microsecond
        let sql = format!(
            "SELECT {} FROM sys_transactions WHERE account_id = ?
             ORDER BY created_at DESC, rowid DESC",
            TRANSACTION_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let txs = stmt
            .query_map(params![account_id], row_to_transaction)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(txs)
    }
}

// === User operations ===

impl UserRepository for DuckDbSession<'_> {
    fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM sys_users WHERE user_id = ?", USER_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_user(row)?)),
            None => Ok(None),
        }
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM sys_users WHERE email = ?", USER_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![User::normalize_email(email)])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_user(row)?)),
            None => Ok(None),
        }
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM sys_users WHERE username = ?", USER_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![username.trim()])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_user(row)?)),
            None => Ok(None),
        }
    }

    fn add_user(&self, user: &NewUser, password_hash: &str) -> Result<User> {
        let sql = format!(
            "INSERT INTO sys_users (username, email, password_hash, role, is_verified, is_active, created_at)
             VALUES (?, ?, ?, ?, FALSE, TRUE, CAST(? AS TIMESTAMP))
             RETURNING {}",
            USER_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![
            user.username,
            user.email,
            password_hash,
            user.role.as_str(),
            format_timestamp(Utc::now()),
        ])?;
        match rows.next()? {
            Some(row) => Ok(row_to_user(row)?),
            None => Err(Error::persistence("user insert returned no row")),
        }
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE sys_users SET password_hash = ?, is_verified = ?, is_active = ?
             WHERE user_id = ?",
            params![user.password_hash, user.is_verified, user.is_active, user.id],
        )?;
        if updated == 0 {
            return Err(Error::not_found(format!("user {}", user.id)));
        }
        Ok(())
    }
}

// === One-time code operations ===

impl OtpRepository for DuckDbSession<'_> {
    fn upsert_challenge(&self, challenge: &OtpChallenge) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sys_otp_challenges (subject_email, purpose, code, issued_at, expires_at, consumed)
             VALUES (?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP), ?)
             ON CONFLICT (subject_email, purpose) DO UPDATE SET
                code = EXCLUDED.code,
                issued_at = EXCLUDED.issued_at,
                expires_at = EXCLUDED.expires_at,
                consumed = EXCLUDED.consumed",
            params![
                challenge.subject_email,
                challenge.purpose.as_str(),
                challenge.code,
                format_timestamp(challenge.issued_at),
                format_timestamp(challenge.expires_at),
                challenge.consumed,
            ],
        )?;
        Ok(())
    }

    fn get_challenge(&self, email: &str, purpose: OtpPurpose) -> Result<Option<OtpChallenge>> {
        let sql = format!(
            "SELECT {} FROM sys_otp_challenges WHERE subject_email = ? AND purpose = ?",
            OTP_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![User::normalize_email(email), purpose.as_str()])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_challenge(row)?)),
            None => Ok(None),
        }
    }
}

// === Audit operations ===

impl AuditRepository for DuckDbSession<'_> {
    fn add_audit_log(&self, entry: &NewAuditLog) -> Result<AuditLog> {
        let sql = format!(
            "INSERT INTO sys_audit_logs (user_id, action, details, ip_address, created_at)
             VALUES (?, ?, ?, ?, CAST(? AS TIMESTAMP))
             RETURNING {}",
            AUDIT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![
            entry.user_id,
            entry.action.as_str(),
            entry.details,
            entry.ip_address,
            format_timestamp(entry.timestamp),
        ])?;
        match rows.next()? {
            Some(row) => Ok(row_to_audit_log(row)?),
            None => Err(Error::persistence("audit insert returned no row")),
        }
    }

    fn get_audit_logs(&self, limit: Option<usize>) -> Result<Vec<AuditLog>> {
        let limit = limit.map(|l| l as i64).unwrap_or(i64::MAX);
        let sql = format!(
            "SELECT {} FROM sys_audit_logs ORDER BY audit_log_id DESC LIMIT ?",
            AUDIT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![limit], row_to_audit_log)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(logs)
    }
}

// === Row mapping ===

fn row_to_account(row: &Row) -> duckdb::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        account_number: row.get(2)?,
        iban: row.get(3)?,
        balance: decimal_column(row, 4)?,
        currency_code: row.get(5)?,
        opened_at: timestamp_column(row, 6)?,
    })
}

fn row_to_transaction(row: &Row) -> duckdb::Result<Transaction> {
    Ok(Transaction {
        id: uuid_column(row, 0)?,
        account_id: row.get(1)?,
        correlation_id: uuid_column(row, 2)?,
        counterparty_iban: row.get(3)?,
        amount: decimal_column(row, 4)?,
        description: row.get(5)?,
        timestamp: timestamp_column(row, 6)?,
        balance_after: decimal_column(row, 7)?,
    })
}

fn row_to_user(row: &Row) -> duckdb::Result<User> {
    let role: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: role.parse().map_err(|e: String| conversion_error(4, e.into()))?,
        is_verified: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
        is_active: row.get(7)?,
    })
}

fn row_to_challenge(row: &Row) -> duckdb::Result<OtpChallenge> {
    let purpose: String = row.get(1)?;
    Ok(OtpChallenge {
        subject_email: row.get(0)?,
        purpose: purpose.parse().map_err(|e: String| conversion_error(1, e.into()))?,
        code: row.get(2)?,
        issued_at: timestamp_column(row, 3)?,
        expires_at: timestamp_column(row, 4)?,
        consumed: row.get(5)?,
    })
}

fn row_to_audit_log(row: &Row) -> duckdb::Result<AuditLog> {
    let action: String = row.get(2)?;
    Ok(AuditLog {
        id: row.get(0)?,
        user_id: row.get(1)?,
        action: action.parse().map_err(|e: String| conversion_error(2, e.into()))?,
        details: row.get(3)?,
        ip_address: row.get(4)?,
        timestamp: timestamp_column(row, 5)?,
    })
}

fn conversion_error(
    idx: usize,
    err: Box<dyn std::error::Error + Send + Sync>,
) -> duckdb::Error {
    duckdb::Error::FromSqlConversionFailure(idx, Type::Text, err)
}

/// Decimals travel as text so no precision is lost through f64
fn decimal_column(row: &Row, idx: usize) -> duckdb::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str_exact(&raw).map_err(|e| conversion_error(idx, Box::new(e)))
}

fn uuid_column(row: &Row, idx: usize) -> duckdb::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, Box::new(e)))
}

fn timestamp_column(row: &Row, idx: usize) -> duckdb::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| conversion_error(idx, Box::new(e)))
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

/// Parse DuckDB's TIMESTAMP text form ("2026-01-14 23:59:59[.123456]")
fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").map(|naive| naive.and_utc())
}
