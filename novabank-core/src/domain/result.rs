//! Result and error types for the core library

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// Every expected business condition (bad input, missing rows, insufficient
/// funds, a wrong code) is one of these variants. Callers classify them with
/// [`Error::kind`] and show [`Error::user_message`] to end users.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient funds in account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account_id: i64,
        balance: Decimal,
        requested: Decimal,
    },

    #[error("Currency mismatch: source is {source_currency}, target is {target_currency}")]
    CurrencyMismatch {
        source_currency: String,
        target_currency: String,
    },

    #[error("Source and destination are the same account")]
    SelfTransfer,

    #[error("Verification code has expired")]
    OtpExpired,

    #[error("Verification code does not match")]
    OtpMismatch,

    #[error("Verification code has already been used")]
    OtpAlreadyUsed,

    #[error("User already exists: {0}")]
    DuplicateUser(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Notification error: {0}")]
    Notification(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a notification error
    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification(msg.into())
    }

    /// Stable classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::CurrencyMismatch { .. } => ErrorKind::CurrencyMismatch,
            Self::SelfTransfer => ErrorKind::SelfTransfer,
            Self::OtpExpired => ErrorKind::OtpExpired,
            Self::OtpMismatch => ErrorKind::OtpMismatch,
            Self::OtpAlreadyUsed => ErrorKind::OtpAlreadyUsed,
            Self::DuplicateUser(_) => ErrorKind::DuplicateUser,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Notification(_) => ErrorKind::Notification,
        }
    }

    /// Message safe to show an end user
    ///
    /// Store and transport failures never leak their raw text here; the
    /// detail stays available through `Display` for internal logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Persistence(_) => {
                "The operation could not be completed. Please try again later.".to_string()
            }
            Self::Notification(_) => {
                "The verification message could not be delivered.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error classification for presentation layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientFunds,
    CurrencyMismatch,
    SelfTransfer,
    OtpExpired,
    OtpMismatch,
    OtpAlreadyUsed,
    DuplicateUser,
    Unauthorized,
    Persistence,
    Notification,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::CurrencyMismatch => "currency_mismatch",
            ErrorKind::SelfTransfer => "self_transfer",
            ErrorKind::OtpExpired => "otp_expired",
            ErrorKind::OtpMismatch => "otp_mismatch",
            ErrorKind::OtpAlreadyUsed => "otp_already_used",
            ErrorKind::DuplicateUser => "duplicate_user",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Persistence => "persistence",
            ErrorKind::Notification => "notification",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation result for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
        }
    }

    /// Create a failed result from a core error
    pub fn fail(error: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.user_message()),
            error_kind: Some(error.kind()),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(&e),
        }
    }
}
