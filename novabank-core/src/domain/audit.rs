//! Audit log domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sensitive actions recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    Register,
    RequestVerification,
    VerifyAccount,
    RequestPasswordReset,
    VerifyPasswordReset,
    ResetPassword,
    Login,
    LoginFailed,
    ActivateUser,
    DeactivateUser,
    NotificationFailed,
    OpenAccount,
    Transfer,
    TransferFailed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Register => "Register",
            AuditAction::RequestVerification => "RequestVerification",
            AuditAction::VerifyAccount => "VerifyAccount",
            AuditAction::RequestPasswordReset => "RequestPasswordReset",
            AuditAction::VerifyPasswordReset => "VerifyPasswordReset",
            AuditAction::ResetPassword => "ResetPassword",
            AuditAction::Login => "Login",
            AuditAction::LoginFailed => "LoginFailed",
            AuditAction::ActivateUser => "ActivateUser",
            AuditAction::DeactivateUser => "DeactivateUser",
            AuditAction::NotificationFailed => "NotificationFailed",
            AuditAction::OpenAccount => "OpenAccount",
            AuditAction::Transfer => "Transfer",
            AuditAction::TransferFailed => "TransferFailed",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = match s {
            "Register" => AuditAction::Register,
            "RequestVerification" => AuditAction::RequestVerification,
            "VerifyAccount" => AuditAction::VerifyAccount,
            "RequestPasswordReset" => AuditAction::RequestPasswordReset,
            "VerifyPasswordReset" => AuditAction::VerifyPasswordReset,
            "ResetPassword" => AuditAction::ResetPassword,
            "Login" => AuditAction::Login,
            "LoginFailed" => AuditAction::LoginFailed,
            "ActivateUser" => AuditAction::ActivateUser,
            "DeactivateUser" => AuditAction::DeactivateUser,
            "NotificationFailed" => AuditAction::NotificationFailed,
            "OpenAccount" => AuditAction::OpenAccount,
            "Transfer" => AuditAction::Transfer,
            "TransferFailed" => AuditAction::TransferFailed,
            other => return Err(format!("unknown audit action: {}", other)),
        };
        Ok(action)
    }
}

/// A persisted audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: AuditAction,
    pub details: String,
    pub ip_address: String,
    pub timestamp: DateTime<Utc>,
}

/// An audit record about to be appended; the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditLog {
    pub user_id: Option<i64>,
    pub action: AuditAction,
    pub details: String,
    pub ip_address: String,
    pub timestamp: DateTime<Utc>,
}

/// Who is performing an operation, as recorded in the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Option<i64>,
    pub ip_address: String,
}

impl Actor {
    pub fn new(user_id: Option<i64>, ip_address: impl Into<String>) -> Self {
        Self {
            user_id,
            ip_address: ip_address.into(),
        }
    }

    /// Anonymous caller on the local machine
    pub fn local() -> Self {
        Self::new(None, "127.0.0.1")
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_round_trip() {
        for action in [
            AuditAction::Register,
            AuditAction::VerifyAccount,
            AuditAction::ResetPassword,
            AuditAction::Transfer,
            AuditAction::TransferFailed,
        ] {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_actor_defaults_to_local() {
        let actor = Actor::default().with_user(7);
        assert_eq!(actor.user_id, Some(7));
        assert_eq!(actor.ip_address, "127.0.0.1");
    }
}
