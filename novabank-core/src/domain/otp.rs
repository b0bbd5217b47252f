//! One-time code challenge model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Number of digits in a one-time code
pub const OTP_LENGTH: usize = 6;

/// What a one-time code proves control of the e-mail address for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OtpPurpose {
    Registration,
    PasswordReset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Registration => "Registration",
            OtpPurpose::PasswordReset => "PasswordReset",
        }
    }

    /// Subject line used by notifiers
    pub fn subject(&self) -> &'static str {
        match self {
            OtpPurpose::Registration => "Account verification - NovaBank",
            OtpPurpose::PasswordReset => "Password reset code - NovaBank",
        }
    }
}

impl fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OtpPurpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Registration" => Ok(OtpPurpose::Registration),
            "PasswordReset" => Ok(OtpPurpose::PasswordReset),
            other => Err(format!("unknown OTP purpose: {}", other)),
        }
    }
}

/// A stored one-time code for an `(email, purpose)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub subject_email: String,
    pub purpose: OtpPurpose,
    #[serde(skip_serializing)]
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

impl OtpChallenge {
    pub fn new(
        subject_email: impl Into<String>,
        purpose: OtpPurpose,
        code: impl Into<String>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            subject_email: subject_email.into(),
            purpose,
            code: code.into(),
            issued_at,
            expires_at: issued_at + ttl,
            consumed: false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Pending = neither consumed nor expired
    pub fn is_pending(&self, now: DateTime<Utc>) -> bool {
        !self.consumed && !self.is_expired(now)
    }
}
