//! Registration, verification, password reset and login flows

mod common;

use chrono::Duration;

use common::{harness, wrong_code, Harness};
use novabank_core::domain::Role;
use novabank_core::ports::{read, Clock, OtpRepository};
use novabank_core::services::Delivery;
use novabank_core::{Actor, AuditAction, Error, OtpPurpose, User};

const EMAIL: &str = "ayse@example.com";
const PASSWORD: &str = "s3cret-pass";

fn registered(h: &Harness) -> User {
    h.ctx
        .auth
        .register(&Actor::local(), "ayse", EMAIL, PASSWORD)
        .unwrap()
        .user
}

fn verified(h: &Harness) -> User {
    registered(h);
    let code = h.notifier.last_code(EMAIL, OtpPurpose::Registration).unwrap();
    h.ctx.auth.verify_account(&Actor::local(), EMAIL, &code).unwrap()
}

const ADMIN_EMAIL: &str = "admin@novabank.example";

fn verified_admin(h: &Harness) -> User {
    h.ctx
        .auth
        .register_with_role(&Actor::local(), "root", ADMIN_EMAIL, PASSWORD, Role::Admin)
        .unwrap();
    let code = h.notifier.last_code(ADMIN_EMAIL, OtpPurpose::Registration).unwrap();
    h.ctx.auth.verify_account(&Actor::local(), ADMIN_EMAIL, &code).unwrap()
}

// ============================================================================
// Registration and verification
// ============================================================================

#[test]
fn test_register_creates_unverified_user_and_sends_code() {
    let h = harness();
    let receipt = h
        .ctx
        .auth
        .register(&Actor::local(), "ayse", "Ayse@Example.com", PASSWORD)
        .unwrap();

    assert_eq!(receipt.user.email, EMAIL);
    assert!(!receipt.user.is_verified);
    assert!(receipt.user.password_hash.starts_with("$argon2id$"));
    assert_eq!(receipt.verification.delivery, Delivery::Delivered);
    assert_eq!(receipt.verification.purpose, OtpPurpose::Registration);
    assert_eq!(
        receipt.verification.expires_at,
        h.clock.now() + Duration::minutes(15)
    );

    let code = h.notifier.last_code(EMAIL, OtpPurpose::Registration).unwrap();
    assert_eq!(code.len(), 6);

    let logs = h.ctx.list_audit_logs(None).unwrap();
    assert_eq!(logs[0].action, AuditAction::Register);
    assert_eq!(logs[0].user_id, Some(receipt.user.id));
}

#[test]
fn test_verify_account_is_single_use() {
    let h = harness();
    registered(&h);
    let code = h.notifier.last_code(EMAIL, OtpPurpose::Registration).unwrap();

    let user = h.ctx.auth.verify_account(&Actor::local(), EMAIL, &code).unwrap();
    assert!(user.is_verified);

    let again = h.ctx.auth.verify_account(&Actor::local(), EMAIL, &code);
    assert!(matches!(again, Err(Error::OtpAlreadyUsed)));
    assert_eq!(h.count_action(AuditAction::VerifyAccount), 1);
}

#[test]
fn test_wrong_code_leaves_user_unverified() {
    let h = harness();
    registered(&h);
    let code = h.notifier.last_code(EMAIL, OtpPurpose::Registration).unwrap();

    let result = h.ctx.auth.verify_account(&Actor::local(), EMAIL, wrong_code(&code));
    assert!(matches!(result, Err(Error::OtpMismatch)));

    let login = h.ctx.auth.login(&Actor::local(), "ayse", PASSWORD);
    assert!(matches!(login, Err(Error::Unauthorized(_))));

    // the right code still works after a mismatch
    assert!(h.ctx.auth.verify_account(&Actor::local(), EMAIL, &code).is_ok());
}

#[test]
fn test_expired_code_then_fresh_code() {
    let h = harness();
    registered(&h);
    let stale = h.notifier.last_code(EMAIL, OtpPurpose::Registration).unwrap();

    h.clock.advance(Duration::minutes(15) + Duration::seconds(1));
    let result = h.ctx.auth.verify_account(&Actor::local(), EMAIL, &stale);
    assert!(matches!(result, Err(Error::OtpExpired)));

    let issued = h.ctx.auth.request_verification(&Actor::local(), EMAIL).unwrap();
    assert!(issued.delivery.is_delivered());
    let fresh = h.notifier.last_code(EMAIL, OtpPurpose::Registration).unwrap();

    let user = h.ctx.auth.verify_account(&Actor::local(), EMAIL, &fresh).unwrap();
    assert!(user.is_verified);
    assert_eq!(h.count_action(AuditAction::RequestVerification), 1);
}

#[test]
fn test_request_verification_for_verified_user_is_rejected() {
    let h = harness();
    verified(&h);
    let result = h.ctx.auth.request_verification(&Actor::local(), EMAIL);
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[test]
fn test_duplicate_registration() {
    let h = harness();
    registered(&h);

    let same_name = h
        .ctx
        .auth
        .register(&Actor::local(), "ayse", "other@example.com", PASSWORD);
    assert!(matches!(same_name, Err(Error::DuplicateUser(_))));

    let same_email = h.ctx.auth.register(&Actor::local(), "ayse2", EMAIL, PASSWORD);
    assert!(matches!(same_email, Err(Error::DuplicateUser(_))));

    assert_eq!(h.count_action(AuditAction::Register), 1);
}

#[test]
fn test_registration_input_is_validated_before_storing() {
    let h = harness();

    let short = h.ctx.auth.register(&Actor::local(), "ayse", EMAIL, "short");
    assert!(matches!(short, Err(Error::Validation(_))));

    let bad_email = h.ctx.auth.register(&Actor::local(), "ayse", "not-an-email", PASSWORD);
    assert!(matches!(bad_email, Err(Error::Validation(_))));

    let blank_name = h.ctx.auth.register(&Actor::local(), "  ", EMAIL, PASSWORD);
    assert!(matches!(blank_name, Err(Error::Validation(_))));

    assert_eq!(h.notifier.sent_count(), 0);
    assert!(h.ctx.list_audit_logs(None).unwrap().is_empty());
}

// ============================================================================
// Notification failures
// ============================================================================

#[test]
fn test_notifier_failure_keeps_registration() {
    let h = harness();
    h.notifier.set_failing(true);

    let receipt = h
        .ctx
        .auth
        .register(&Actor::local(), "ayse", EMAIL, PASSWORD)
        .unwrap();

    match &receipt.verification.delivery {
        Delivery::Failed { reason } => {
            assert_eq!(reason, &Error::notification("any").user_message());
            assert!(!reason.contains("smtp relay"));
        }
        other => panic!("expected failed delivery, got {:?}", other),
    }
    assert_eq!(h.count_action(AuditAction::Register), 1);
    assert_eq!(h.count_action(AuditAction::NotificationFailed), 1);

    // the user exists, so a second attempt is a duplicate rather than a new user
    let again = h.ctx.auth.register(&Actor::local(), "ayse", EMAIL, PASSWORD);
    assert!(matches!(again, Err(Error::DuplicateUser(_))));

    h.notifier.set_failing(false);
    h.ctx.auth.request_verification(&Actor::local(), EMAIL).unwrap();
    let code = h.notifier.last_code(EMAIL, OtpPurpose::Registration).unwrap();
    assert!(h.ctx.auth.verify_account(&Actor::local(), EMAIL, &code).is_ok());
}

#[test]
fn test_notifier_failure_keeps_password_reset_request() {
    let h = harness();
    verified(&h);
    h.notifier.set_failing(true);

    let issued = h.ctx.auth.request_password_reset(&Actor::local(), EMAIL).unwrap();
    assert!(matches!(issued.delivery, Delivery::Failed { .. }));
    assert_eq!(issued.purpose, OtpPurpose::PasswordReset);
    assert_eq!(h.count_action(AuditAction::RequestPasswordReset), 1);
    assert_eq!(h.count_action(AuditAction::NotificationFailed), 1);
    assert!(h.notifier.last_code(EMAIL, OtpPurpose::PasswordReset).is_none());

    // the committed challenge is still usable with the code the notifier never got
    let challenge = read(&*h.store, |s| s.get_challenge(EMAIL, OtpPurpose::PasswordReset))
        .unwrap()
        .unwrap();
    h.ctx
        .auth
        .reset_password(&Actor::local(), EMAIL, &challenge.code, "brand-new-pass")
        .unwrap();
    assert!(h.ctx.auth.login(&Actor::local(), "ayse", "brand-new-pass").is_ok());
}

// ============================================================================
// Password reset
// ============================================================================

#[test]
fn test_reset_password_with_wrong_code_keeps_old_password() {
    let h = harness();
    verified(&h);

    h.ctx.auth.request_password_reset(&Actor::local(), EMAIL).unwrap();
    let code = h.notifier.last_code(EMAIL, OtpPurpose::PasswordReset).unwrap();

    let result = h
        .ctx
        .auth
        .reset_password(&Actor::local(), EMAIL, wrong_code(&code), "brand-new-pass");
    assert!(matches!(result, Err(Error::OtpMismatch)));
    assert!(h.ctx.auth.login(&Actor::local(), "ayse", PASSWORD).is_ok());

    h.ctx
        .auth
        .reset_password(&Actor::local(), EMAIL, &code, "brand-new-pass")
        .unwrap();

    assert!(h.ctx.auth.login(&Actor::local(), "ayse", "brand-new-pass").is_ok());
    assert!(matches!(
        h.ctx.auth.login(&Actor::local(), "ayse", PASSWORD),
        Err(Error::Unauthorized(_))
    ));
    assert_eq!(h.count_action(AuditAction::ResetPassword), 1);
}

#[test]
fn test_reset_password_after_expiry() {
    let h = harness();
    verified(&h);

    h.ctx.auth.request_password_reset(&Actor::local(), EMAIL).unwrap();
    let code = h.notifier.last_code(EMAIL, OtpPurpose::PasswordReset).unwrap();

    h.clock.advance(Duration::minutes(16));
    let result = h
        .ctx
        .auth
        .reset_password(&Actor::local(), EMAIL, &code, "brand-new-pass");
    assert!(matches!(result, Err(Error::OtpExpired)));
    assert!(h.ctx.auth.login(&Actor::local(), "ayse", PASSWORD).is_ok());
}

#[test]
fn test_registration_code_cannot_reset_password() {
    let h = harness();
    registered(&h);
    let code = h.notifier.last_code(EMAIL, OtpPurpose::Registration).unwrap();

    let result = h
        .ctx
        .auth
        .reset_password(&Actor::local(), EMAIL, &code, "brand-new-pass");
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test]
fn test_reset_for_unknown_email() {
    let h = harness();
    let result = h.ctx.auth.request_password_reset(&Actor::local(), "ghost@example.com");
    assert!(matches!(result, Err(Error::NotFound(_))));
    assert_eq!(h.notifier.sent_count(), 0);
}

#[test]
fn test_grant_flow_changes_password_once() {
    let h = harness();
    verified(&h);

    h.ctx.auth.request_password_reset(&Actor::local(), EMAIL).unwrap();
    let code = h.notifier.last_code(EMAIL, OtpPurpose::PasswordReset).unwrap();

    let grant = h
        .ctx
        .auth
        .verify_password_reset(&Actor::local(), EMAIL, &code)
        .unwrap();
    assert_eq!(grant.email(), EMAIL);

    // the code was consumed by the verification step
    let reuse = h.ctx.auth.verify_password_reset(&Actor::local(), EMAIL, &code);
    assert!(matches!(reuse, Err(Error::OtpAlreadyUsed)));

    h.ctx
        .auth
        .change_password(&Actor::local(), grant, "brand-new-pass")
        .unwrap();
    assert!(h.ctx.auth.login(&Actor::local(), EMAIL, "brand-new-pass").is_ok());

    let actions = h.audit_actions();
    assert!(actions.contains(&AuditAction::VerifyPasswordReset));
    assert!(actions.contains(&AuditAction::ResetPassword));
}

#[test]
fn test_grant_expires_with_its_code() {
    let h = harness();
    verified(&h);

    h.ctx.auth.request_password_reset(&Actor::local(), EMAIL).unwrap();
    let code = h.notifier.last_code(EMAIL, OtpPurpose::PasswordReset).unwrap();
    let grant = h
        .ctx
        .auth
        .verify_password_reset(&Actor::local(), EMAIL, &code)
        .unwrap();

    h.clock.advance(Duration::minutes(20));
    let result = h.ctx.auth.change_password(&Actor::local(), grant, "brand-new-pass");
    assert!(matches!(result, Err(Error::OtpExpired)));
    assert!(h.ctx.auth.login(&Actor::local(), "ayse", PASSWORD).is_ok());
}

// ============================================================================
// Login
// ============================================================================

#[test]
fn test_login_outcomes_are_audited() {
    let h = harness();
    let user = verified(&h);

    let ok = h.ctx.auth.login(&Actor::local(), "ayse", PASSWORD).unwrap();
    assert_eq!(ok.id, user.id);

    let wrong = h.ctx.auth.login(&Actor::local(), "ayse", "not-the-password");
    assert!(matches!(wrong, Err(Error::Unauthorized(_))));

    let unknown = h.ctx.auth.login(&Actor::local(), "nobody", PASSWORD);
    assert!(matches!(unknown, Err(Error::NotFound(_))));

    assert_eq!(h.count_action(AuditAction::Login), 1);
    assert_eq!(h.count_action(AuditAction::LoginFailed), 2);

    let failed: Vec<_> = h
        .ctx
        .list_audit_logs(None)
        .unwrap()
        .into_iter()
        .filter(|l| l.action == AuditAction::LoginFailed)
        .collect();
    assert_eq!(failed[0].user_id, None);
    assert_eq!(failed[1].user_id, Some(user.id));
}

#[test]
fn test_inactive_user_cannot_log_in() {
    let h = harness();
    let user = verified(&h);
    let admin = verified_admin(&h);
    let as_admin = Actor::local().with_user(admin.id);

    let changed = h.ctx.auth.set_user_active(&as_admin, EMAIL, false).unwrap();
    assert!(!changed.is_active);
    assert_eq!(h.count_action(AuditAction::DeactivateUser), 1);

    let login = h.ctx.auth.login(&Actor::local(), "ayse", PASSWORD);
    assert!(matches!(login, Err(Error::Unauthorized(_))));
    let last = &h.ctx.list_audit_logs(Some(1)).unwrap()[0];
    assert_eq!(last.action, AuditAction::LoginFailed);
    assert_eq!(last.user_id, Some(user.id));
    assert!(last.details.contains("inactive"));

    h.ctx.auth.set_user_active(&as_admin, EMAIL, true).unwrap();
    assert!(h.ctx.auth.login(&Actor::local(), "ayse", PASSWORD).is_ok());
    assert_eq!(h.count_action(AuditAction::ActivateUser), 1);
}

#[test]
fn test_only_admins_change_account_status() {
    let h = harness();
    let user = verified(&h);
    let admin = verified_admin(&h);

    for actor in [Actor::local(), Actor::local().with_user(user.id)] {
        let result = h.ctx.auth.set_user_active(&actor, ADMIN_EMAIL, false);
        assert!(matches!(result, Err(Error::Unauthorized(_))));
    }

    let own = h
        .ctx
        .auth
        .set_user_active(&Actor::local().with_user(admin.id), ADMIN_EMAIL, false);
    assert!(matches!(own, Err(Error::Validation(_))));

    assert!(h.ctx.auth.login(&Actor::local(), ADMIN_EMAIL, PASSWORD).is_ok());
    assert_eq!(h.count_action(AuditAction::DeactivateUser), 0);
}

// ============================================================================
// Audit completeness
// ============================================================================

#[test]
fn test_every_successful_mutation_is_audited() {
    let h = harness();

    registered(&h);
    h.ctx.auth.request_verification(&Actor::local(), EMAIL).unwrap();
    let code = h.notifier.last_code(EMAIL, OtpPurpose::Registration).unwrap();
    h.ctx.auth.verify_account(&Actor::local(), EMAIL, &code).unwrap();
    h.ctx.auth.request_password_reset(&Actor::local(), EMAIL).unwrap();
    let reset = h.notifier.last_code(EMAIL, OtpPurpose::PasswordReset).unwrap();
    h.ctx
        .auth
        .reset_password(&Actor::local(), EMAIL, &reset, "brand-new-pass")
        .unwrap();
    h.ctx.auth.login(&Actor::local(), "ayse", "brand-new-pass").unwrap();

    let mut actions = h.audit_actions();
    actions.reverse();
    assert_eq!(
        actions,
        vec![
            AuditAction::Register,
            AuditAction::RequestVerification,
            AuditAction::VerifyAccount,
            AuditAction::RequestPasswordReset,
            AuditAction::ResetPassword,
            AuditAction::Login,
        ]
    );
    assert!(h
        .ctx
        .list_audit_logs(None)
        .unwrap()
        .iter()
        .all(|l| l.ip_address == "127.0.0.1"));
}
