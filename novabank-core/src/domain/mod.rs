//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
mod audit;
mod otp;
mod transaction;
mod user;
pub mod result;

pub use account::{Account, NewAccount, MONEY_SCALE};
pub use audit::{Actor, AuditAction, AuditLog, NewAuditLog};
pub use otp::{OtpChallenge, OtpPurpose, OTP_LENGTH};
pub use transaction::Transaction;
pub use user::{NewUser, Role, User};
