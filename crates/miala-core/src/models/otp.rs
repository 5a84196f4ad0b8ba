//! One-time password verification records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpVerification {
    pub id: Uuid,
    pub email: String,
    pub otp_code: String,
    pub created_at: DateTime<Utc>,
    /// `None` only for legacy rows; such rows are always treated as
    /// expired.
    pub expires_at: Option<DateTime<Utc>>,
    pub verified: bool,
}

impl OtpVerification {
    /// An OTP is expired when it has no expiry or the expiry is before
    /// `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at < now,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOtp {
    pub email: String,
    pub otp_code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn otp(expires_at: Option<DateTime<Utc>>) -> OtpVerification {
        OtpVerification {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            otp_code: "123456".into(),
            created_at: Utc::now(),
            expires_at,
            verified: false,
        }
    }

    #[test]
    fn missing_expiry_counts_as_expired() {
        assert!(otp(None).is_expired_at(Utc::now()));
    }

    #[test]
    fn past_expiry_is_expired_future_is_not() {
        let now = Utc::now();
        assert!(otp(Some(now - Duration::minutes(1))).is_expired_at(now));
        assert!(!otp(Some(now + Duration::minutes(1))).is_expired_at(now));
    }
}
