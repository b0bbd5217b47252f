//! One-time code issuing and verification
//!
//! Per `(email, purpose)` a challenge moves NoChallenge -> Pending -> Consumed.
//! Issuing again replaces the stored challenge, so only the newest code is
//! ever accepted.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use subtle::ConstantTimeEq;

use crate::domain::result::{Error, Result};
use crate::domain::{OtpChallenge, OtpPurpose, User, OTP_LENGTH};
use crate::ports::OtpRepository;

/// Uniform 6-digit code from the OS CSPRNG
pub fn generate_code() -> String {
    let n: u32 = OsRng.gen_range(0..1_000_000);
    format!("{:0width$}", n, width = OTP_LENGTH)
}

/// Compare two codes in time independent of where they differ
fn codes_match(expected: &str, provided: &str) -> bool {
    let max_len = expected.len().max(provided.len());

    // Different pad bytes so a length difference can never compare equal
    let mut a = vec![0u8; max_len];
    let mut b = vec![0xFFu8; max_len];
    a[..expected.len()].copy_from_slice(expected.as_bytes());
    b[..provided.len()].copy_from_slice(provided.as_bytes());

    let lengths_equal = expected.len().ct_eq(&provided.len());
    let contents_equal = a.ct_eq(&b);
    (lengths_equal & contents_equal).into()
}

pub struct OtpAuthenticator {
    ttl: Duration,
}

impl OtpAuthenticator {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Store a fresh challenge for `email`, replacing any previous one
    pub fn issue<R: OtpRepository + ?Sized>(
        &self,
        repo: &R,
        email: &str,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<OtpChallenge> {
        let challenge = OtpChallenge::new(
            User::normalize_email(email),
            purpose,
            generate_code(),
            now,
            self.ttl,
        );
        repo.upsert_challenge(&challenge)?;
        Ok(challenge)
    }

    /// Check `code` against the stored challenge and consume it
    ///
    /// Checks run in a fixed order: missing, already used, expired, wrong
    /// code. A wrong code leaves the challenge pending.
    pub fn verify<R: OtpRepository + ?Sized>(
        &self,
        repo: &R,
        email: &str,
        purpose: OtpPurpose,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<OtpChallenge> {
        let mut challenge = repo.get_challenge(email, purpose)?.ok_or_else(|| {
            Error::not_found(format!("no {} code was requested for {}", purpose, email))
        })?;

        if challenge.consumed {
            return Err(Error::OtpAlreadyUsed);
        }
        if challenge.is_expired(now) {
            return Err(Error::OtpExpired);
        }
        if !codes_match(&challenge.code, code.trim()) {
            return Err(Error::OtpMismatch);
        }

        challenge.consumed = true;
        repo.upsert_challenge(&challenge)?;
        Ok(challenge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryChallenges {
        rows: RefCell<HashMap<(String, OtpPurpose), OtpChallenge>>,
    }

    impl OtpRepository for MemoryChallenges {
        fn upsert_challenge(&self, challenge: &OtpChallenge) -> Result<()> {
            self.rows.borrow_mut().insert(
                (challenge.subject_email.clone(), challenge.purpose),
                challenge.clone(),
            );
            Ok(())
        }

        fn get_challenge(&self, email: &str, purpose: OtpPurpose) -> Result<Option<OtpChallenge>> {
            Ok(self.rows.borrow().get(&(email.to_string(), purpose)).cloned())
        }
    }

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), OTP_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_codes_match() {
        assert!(codes_match("012345", "012345"));
        assert!(!codes_match("012345", "012346"));
        assert!(!codes_match("012345", "01234"));
        assert!(!codes_match("012345", ""));
    }

    #[test]
    fn test_verify_consumes_challenge() {
        let repo = MemoryChallenges::default();
        let otp = OtpAuthenticator::new(Duration::minutes(15));
        let now = Utc::now();

        let issued = otp.issue(&repo, "a@b.com", OtpPurpose::Registration, now).unwrap();
        let verified = otp
            .verify(&repo, "a@b.com", OtpPurpose::Registration, &issued.code, now)
            .unwrap();
        assert!(verified.consumed);

        let again = otp.verify(&repo, "a@b.com", OtpPurpose::Registration, &issued.code, now);
        assert!(matches!(again, Err(Error::OtpAlreadyUsed)));
    }

    #[test]
    fn test_mismatch_keeps_challenge_pending() {
        let repo = MemoryChallenges::default();
        let otp = OtpAuthenticator::new(Duration::minutes(15));
        let now = Utc::now();

        let issued = otp.issue(&repo, "a@b.com", OtpPurpose::PasswordReset, now).unwrap();
        let wrong = if issued.code == "000000" { "111111" } else { "000000" };

        let result = otp.verify(&repo, "a@b.com", OtpPurpose::PasswordReset, wrong, now);
        assert!(matches!(result, Err(Error::OtpMismatch)));
        assert!(otp
            .verify(&repo, "a@b.com", OtpPurpose::PasswordReset, &issued.code, now)
            .is_ok());
    }

    #[test]
    fn test_expiry_is_strictly_after_deadline() {
        let repo = MemoryChallenges::default();
        let otp = OtpAuthenticator::new(Duration::minutes(15));
        let now = Utc::now();

        let issued = otp.issue(&repo, "a@b.com", OtpPurpose::Registration, now).unwrap();
        let late = otp.verify(
            &repo,
            "a@b.com",
            OtpPurpose::Registration,
            &issued.code,
            now + Duration::minutes(15) + Duration::seconds(1),
        );
        assert!(matches!(late, Err(Error::OtpExpired)));

        let on_time = otp.verify(
            &repo,
            "a@b.com",
            OtpPurpose::Registration,
            &issued.code,
            now + Duration::minutes(15),
        );
        assert!(on_time.is_ok());
    }

    #[test]
    fn test_reissue_invalidates_previous_code() {
        let repo = MemoryChallenges::default();
        let otp = OtpAuthenticator::new(Duration::minutes(15));
        let now = Utc::now();

        let first = otp.issue(&repo, "a@b.com", OtpPurpose::Registration, now).unwrap();
        let mut second = otp.issue(&repo, "a@b.com", OtpPurpose::Registration, now).unwrap();
        while second.code == first.code {
            second = otp.issue(&repo, "a@b.com", OtpPurpose::Registration, now).unwrap();
        }

        let old = otp.verify(&repo, "a@b.com", OtpPurpose::Registration, &first.code, now);
        assert!(matches!(old, Err(Error::OtpMismatch)));
    }

    #[test]
    fn test_missing_challenge() {
        let repo = MemoryChallenges::default();
        let otp = OtpAuthenticator::new(Duration::minutes(15));
        let result = otp.verify(&repo, "nobody@b.com", OtpPurpose::Registration, "123456", Utc::now());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
