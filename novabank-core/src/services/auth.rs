//! Auth service - registration, e-mail verification, password reset and login
//!
//! Every state change commits together with its audit entry. One-time codes
//! are handed to the [`Notifier`] only after that commit; a delivery failure
//! is reported on the returned value and audited, but never undoes the
//! committed change.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{Actor, AuditAction, NewUser, OtpChallenge, OtpPurpose, Role, User};
use crate::ports::{atomically, read, Clock, Notifier, Session, Store};
use crate::services::{AuditTrail, OtpAuthenticator, PasswordService};

/// Whether a one-time code reached the notifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Delivery {
    Delivered,
    Failed { reason: String },
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}

/// A freshly issued code; the code itself is only ever sent to the notifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpIssued {
    pub email: String,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
    pub delivery: Delivery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    pub user: User,
    pub verification: OtpIssued,
}

/// Proof that a password-reset code was verified
///
/// Not `Clone`: [`AuthService::change_password`] takes it by value, so one
/// verified code allows exactly one password change.
#[derive(Debug)]
pub struct PasswordResetGrant {
    user_id: i64,
    email: String,
    expires_at: DateTime<Utc>,
}

impl PasswordResetGrant {
    pub fn email(&self) -> &str {
        &self.email
    }

    /// The grant is honoured until the verified code's own deadline
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

pub struct AuthService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    audit: Arc<AuditTrail>,
    otp: OtpAuthenticator,
    passwords: PasswordService,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        audit: Arc<AuditTrail>,
        otp: OtpAuthenticator,
        passwords: PasswordService,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            audit,
            otp,
            passwords,
        }
    }

    /// Create an unverified customer and send them a registration code
    pub fn register(
        &self,
        actor: &Actor,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegistrationReceipt> {
        self.register_with_role(actor, username, email, password, Role::Customer)
    }

    /// Like [`Self::register`], for a user with the given role
    pub fn register_with_role(
        &self,
        actor: &Actor,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<RegistrationReceipt> {
        let new_user = NewUser::new(username, email).with_role(role);
        new_user.validate().map_err(Error::validation)?;
        self.passwords.validate(password)?;
        let hash = self.passwords.hash_password(password)?;

        let (user, challenge) = atomically(self.store.as_ref(), |session| {
            if session.get_user_by_username(&new_user.username)?.is_some() {
                return Err(Error::DuplicateUser(format!("username {}", new_user.username)));
            }
            if session.get_user_by_email(&new_user.email)?.is_some() {
                return Err(Error::DuplicateUser(format!("e-mail {}", new_user.email)));
            }

            let user = session.add_user(&new_user, &hash)?;
            let challenge =
                self.otp.issue(session, &user.email, OtpPurpose::Registration, self.clock.now())?;
            self.audit.append(
                session,
                &actor.clone().with_user(user.id),
                AuditAction::Register,
                format!("new user registered: {}", user.username),
            )?;
            Ok((user, challenge))
        })?;

        tracing::info!(user_id = user.id, "user registered");
        let actor = actor.clone().with_user(user.id);
        let verification = self.deliver(&actor, &challenge);
        Ok(RegistrationReceipt { user, verification })
    }

    /// Issue a new registration code for an unverified user
    pub fn request_verification(&self, actor: &Actor, email: &str) -> Result<OtpIssued> {
        let email = checked_email(email)?;

        let (user, challenge) = atomically(self.store.as_ref(), |session| {
            let user = find_user(session, &email)?;
            if user.is_verified {
                return Err(Error::validation("account is already verified"));
            }
            let challenge =
                self.otp.issue(session, &user.email, OtpPurpose::Registration, self.clock.now())?;
            self.audit.append(
                session,
                &actor.clone().with_user(user.id),
                AuditAction::RequestVerification,
                "verification code issued",
            )?;
            Ok((user, challenge))
        })?;

        Ok(self.deliver(&actor.clone().with_user(user.id), &challenge))
    }

    /// Verify a registration code and mark the user verified
    pub fn verify_account(&self, actor: &Actor, email: &str, code: &str) -> Result<User> {
        let email = checked_email(email)?;

        let user = atomically(self.store.as_ref(), |session| {
            let mut user = find_user(session, &email)?;
            self.otp
                .verify(session, &user.email, OtpPurpose::Registration, code, self.clock.now())?;
            user.is_verified = true;
            session.update_user(&user)?;
            self.audit.append(
                session,
                &actor.clone().with_user(user.id),
                AuditAction::VerifyAccount,
                "e-mail verified",
            )?;
            Ok(user)
        })?;

        tracing::info!(user_id = user.id, "account verified");
        Ok(user)
    }

    /// Send a password-reset code
    pub fn request_password_reset(&self, actor: &Actor, email: &str) -> Result<OtpIssued> {
        let email = checked_email(email)?;

        let (user, challenge) = atomically(self.store.as_ref(), |session| {
            let user = find_user(session, &email)?;
            let challenge =
                self.otp.issue(session, &user.email, OtpPurpose::PasswordReset, self.clock.now())?;
            self.audit.append(
                session,
                &actor.clone().with_user(user.id),
                AuditAction::RequestPasswordReset,
                "password reset code issued",
            )?;
            Ok((user, challenge))
        })?;

        Ok(self.deliver(&actor.clone().with_user(user.id), &challenge))
    }

    /// Verify a password-reset code and hand out a grant for [`Self::change_password`]
    ///
    /// The code is consumed here; the grant is the only way to use it.
    pub fn verify_password_reset(
        &self,
        actor: &Actor,
        email: &str,
        code: &str,
    ) -> Result<PasswordResetGrant> {
        let email = checked_email(email)?;

        atomically(self.store.as_ref(), |session| {
            let user = find_user(session, &email)?;
            let challenge = self.otp.verify(
                session,
                &user.email,
                OtpPurpose::PasswordReset,
                code,
                self.clock.now(),
            )?;
            self.audit.append(
                session,
                &actor.clone().with_user(user.id),
                AuditAction::VerifyPasswordReset,
                "password reset code verified",
            )?;
            Ok(PasswordResetGrant {
                user_id: user.id,
                email: user.email,
                expires_at: challenge.expires_at,
            })
        })
    }

    /// Set a new password using a grant from [`Self::verify_password_reset`]
    pub fn change_password(
        &self,
        actor: &Actor,
        grant: PasswordResetGrant,
        new_password: &str,
    ) -> Result<()> {
        self.passwords.validate(new_password)?;
        if self.clock.now() > grant.expires_at {
            return Err(Error::OtpExpired);
        }
        let hash = self.passwords.hash_password(new_password)?;

        atomically(self.store.as_ref(), |session| {
            let mut user = find_user(session, &grant.email)?;
            if user.id != grant.user_id {
                return Err(Error::not_found(format!("user {}", grant.user_id)));
            }
            user.password_hash = hash;
            session.update_user(&user)?;
            self.audit.append(
                session,
                &actor.clone().with_user(user.id),
                AuditAction::ResetPassword,
                "password changed",
            )?;
            Ok(())
        })?;

        tracing::info!(user_id = grant.user_id, "password changed");
        Ok(())
    }

    /// Verify a password-reset code and set the new password in one step
    pub fn reset_password(
        &self,
        actor: &Actor,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<()> {
        let email = checked_email(email)?;
        self.passwords.validate(new_password)?;
        let hash = self.passwords.hash_password(new_password)?;

        let user_id = atomically(self.store.as_ref(), |session| {
            let mut user = find_user(session, &email)?;
            self.otp.verify(
                session,
                &user.email,
                OtpPurpose::PasswordReset,
                code,
                self.clock.now(),
            )?;
            user.password_hash = hash;
            session.update_user(&user)?;
            self.audit.append(
                session,
                &actor.clone().with_user(user.id),
                AuditAction::ResetPassword,
                "password reset",
            )?;
            Ok(user.id)
        })?;

        tracing::info!(user_id, "password reset");
        Ok(())
    }

    /// Check credentials of a verified user
    ///
    /// `login` is a username, or an e-mail address when it contains `@`.
    pub fn login(&self, actor: &Actor, login: &str, password: &str) -> Result<User> {
        let login = login.trim();
        if login.is_empty() {
            return Err(Error::validation("username cannot be empty"));
        }
        if password.is_empty() {
            return Err(Error::validation("password cannot be empty"));
        }

        let found = read(self.store.as_ref(), |session| {
            if login.contains('@') {
                session.get_user_by_email(&User::normalize_email(login))
            } else {
                session.get_user_by_username(login)
            }
        })?;

        let user = match found {
            Some(user) => user,
            None => {
                self.audit.record_detached(
                    actor,
                    AuditAction::LoginFailed,
                    format!("unknown user: {}", login),
                );
                return Err(Error::not_found(format!("user {}", login)));
            }
        };
        let actor = actor.clone().with_user(user.id);

        if !user.is_verified {
            self.audit
                .record_detached(&actor, AuditAction::LoginFailed, "account not verified");
            return Err(Error::Unauthorized("account is not verified".to_string()));
        }
        if !user.is_active {
            self.audit
                .record_detached(&actor, AuditAction::LoginFailed, "account is inactive");
            return Err(Error::Unauthorized(
                "account is inactive, contact an administrator".to_string(),
            ));
        }
        if !self.passwords.verify_password(password, &user.password_hash)? {
            self.audit
                .record_detached(&actor, AuditAction::LoginFailed, "invalid password");
            return Err(Error::Unauthorized("invalid username or password".to_string()));
        }

        atomically(self.store.as_ref(), |session| {
            self.audit
                .append(session, &actor, AuditAction::Login, "user logged in")
        })?;
        Ok(user)
    }

    /// Let an admin lock a user out of login, or let them back in
    ///
    /// `actor.user_id` must be a verified, active admin.
    pub fn set_user_active(&self, actor: &Actor, email: &str, active: bool) -> Result<User> {
        let email = checked_email(email)?;
        let admin_id = actor
            .user_id
            .ok_or_else(|| Error::Unauthorized("an admin must be signed in".to_string()))?;

        let user = atomically(self.store.as_ref(), |session| {
            match session.get_user_by_id(admin_id)? {
                Some(admin) if admin.role == Role::Admin && admin.is_verified && admin.is_active => {}
                _ => {
                    return Err(Error::Unauthorized(
                        "only an admin can change account status".to_string(),
                    ))
                }
            }

            let mut user = find_user(session, &email)?;
            if user.id == admin_id && !active {
                return Err(Error::validation("admins cannot deactivate themselves"));
            }
            user.is_active = active;
            session.update_user(&user)?;

            let action = if active {
                AuditAction::ActivateUser
            } else {
                AuditAction::DeactivateUser
            };
            self.audit.append(
                session,
                actor,
                action,
                format!("user {} ({})", user.username, user.id),
            )?;
            Ok(user)
        })?;

        tracing::info!(user_id = user.id, active, "account status changed");
        Ok(user)
    }

    /// Hand a committed challenge to the notifier
    fn deliver(&self, actor: &Actor, challenge: &OtpChallenge) -> OtpIssued {
        let delivery = match self.notifier.send_otp(
            &challenge.subject_email,
            &challenge.code,
            challenge.purpose,
        ) {
            Ok(()) => Delivery::Delivered,
            Err(e) => {
                tracing::warn!(
                    notifier = self.notifier.name(),
                    purpose = %challenge.purpose,
                    "code delivery failed: {}",
                    e
                );
                self.audit.record_detached(
                    actor,
                    AuditAction::NotificationFailed,
                    format!(
                        "{} code for {} not delivered via {}",
                        challenge.purpose,
                        challenge.subject_email,
                        self.notifier.name()
                    ),
                );
                Delivery::Failed {
                    reason: e.user_message(),
                }
            }
        };

        OtpIssued {
            email: challenge.subject_email.clone(),
            purpose: challenge.purpose,
            expires_at: challenge.expires_at,
            delivery,
        }
    }
}

fn checked_email(email: &str) -> Result<String> {
    let email = User::normalize_email(email);
    if !User::is_valid_email(&email) {
        return Err(Error::validation("e-mail address is malformed"));
    }
    Ok(email)
}

fn find_user(session: &dyn Session, email: &str) -> Result<User> {
    session
        .get_user_by_email(email)?
        .ok_or_else(|| Error::not_found(format!("user with e-mail {}", email)))
}
