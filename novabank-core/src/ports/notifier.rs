//! Notifier port - delivery of one-time codes

use crate::domain::result::Result;
use crate::domain::OtpPurpose;

/// Delivers one-time codes to their owners (e-mail, SMS, ...)
///
/// Delivery happens after the challenge is committed. A failure here is
/// reported to the caller but never undoes the committed state change.
pub trait Notifier: Send + Sync {
    /// Short name used in logs ("console", "webhook")
    fn name(&self) -> &str;

    fn send_otp(&self, email: &str, code: &str, purpose: OtpPurpose) -> Result<()>;
}
