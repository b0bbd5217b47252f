//! Shared fixtures for integration tests: a file-backed DuckDB store in a
//! temp dir, a notifier that records codes, and a clock tests can move.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;

use novabank_core::adapters::duckdb::DuckDbStore;
use novabank_core::config::Config;
use novabank_core::ports::{Clock, Notifier};
use novabank_core::services::PasswordPolicy;
use novabank_core::{Account, Actor, AuditAction, Error, NewAccount, NovaBankContext, OtpPurpose};

pub const IBAN_A: &str = "TR330006100519786457841326";
pub const IBAN_B: &str = "TR320010009999901234567890";
pub const IBAN_C: &str = "DE89370400440532013000";
pub const IBAN_D: &str = "TR120006200000000123456789";

/// Records every code it is asked to deliver; can be switched to fail
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String, OtpPurpose)>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Most recent code sent to `email` for `purpose`
    pub fn last_code(&self, email: &str, purpose: OtpPurpose) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(e, _, p)| e == email && *p == purpose)
            .map(|(_, code, _)| code.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    fn send_otp(&self, email: &str, code: &str, purpose: OtpPurpose) -> novabank_core::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::notification("smtp relay unreachable"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), code.to_string(), purpose));
        Ok(())
    }
}

/// A clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub struct Harness {
    pub store: Arc<DuckDbStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
    pub ctx: NovaBankContext,
    _dir: TempDir,
}

/// Defaults with Argon2 costs low enough for tests
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.password = PasswordPolicy {
        time_cost: 1,
        memory_cost: 1024,
        parallelism: 1,
        min_length: 8,
    };
    config
}

pub fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(DuckDbStore::open(&dir.path().join("novabank.duckdb")).unwrap());
    store.ensure_schema().unwrap();

    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new());
    let ctx = NovaBankContext::with_parts(
        test_config(),
        store.clone(),
        notifier.clone(),
        clock.clone(),
    );

    Harness {
        store,
        notifier,
        clock,
        ctx,
        _dir: dir,
    }
}

impl Harness {
    pub fn open(&self, customer_id: i64, iban: &str, currency: &str, balance: i64) -> Account {
        let account = NewAccount::new(
            customer_id,
            format!("NB-{}", &iban[iban.len() - 6..]),
            iban,
            currency,
            Decimal::new(balance, 0),
        );
        self.ctx.open_account(&Actor::local(), &account).unwrap()
    }

    pub fn balance(&self, account_id: i64) -> Decimal {
        self.ctx.accounts.get_account(account_id).unwrap().balance
    }

    pub fn audit_actions(&self) -> Vec<AuditAction> {
        self.ctx
            .list_audit_logs(None)
            .unwrap()
            .into_iter()
            .map(|l| l.action)
            .collect()
    }

    pub fn count_action(&self, action: AuditAction) -> usize {
        self.audit_actions().into_iter().filter(|a| *a == action).count()
    }
}

/// A six-digit code guaranteed to differ from `code`
pub fn wrong_code(code: &str) -> &'static str {
    if code == "000000" {
        "111111"
    } else {
        "000000"
    }
}
