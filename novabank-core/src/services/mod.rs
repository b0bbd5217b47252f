//! Service layer - business logic orchestration
//!
//! Services coordinate domain rules and port interactions. Each service
//! focuses on one feature area and is built once by the composition root.

mod accounts;
mod audit;
mod auth;
mod ledger;
mod locks;
pub mod logging;
pub mod migration;
mod otp;
mod password;
mod transfer;

pub use accounts::AccountService;
pub use audit::AuditTrail;
pub use auth::{AuthService, Delivery, OtpIssued, PasswordResetGrant, RegistrationReceipt};
pub use ledger::AccountLedger;
pub use locks::AccountLocks;
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use otp::{generate_code, OtpAuthenticator};
pub use password::{PasswordPolicy, PasswordService};
pub use transfer::{TransferReceipt, TransferRequest, TransferService};
