//! OTP registry: issue, verify and garbage-collect one-time passwords
//! sent to an email address.

use std::sync::Arc;

use chrono::{Duration, Utc};
use miala_core::error::MialaResult;
use miala_core::models::otp::{CreateOtp, OtpVerification};
use miala_core::repository::OtpRepository;
use rand::Rng;
use tracing::{info, warn};

use crate::email::{self, EmailSender};
use crate::error::AuthError;

/// Random six-digit code in `100000..=999999`.
pub fn generate_code() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

pub struct OtpService<O: OtpRepository, E: EmailSender> {
    repo: O,
    email: Arc<E>,
    lifetime: Duration,
}

impl<O: OtpRepository, E: EmailSender> OtpService<O, E> {
    pub fn new(repo: O, email: Arc<E>, lifetime_secs: u64) -> Self {
        Self {
            repo,
            email,
            lifetime: Duration::seconds(lifetime_secs as i64),
        }
    }

    /// Replace any pending code for `email` with a fresh one and mail
    /// it. A delivery failure is returned but the new code stays
    /// stored.
    pub async fn issue(&self, email: &str) -> MialaResult<()> {
        // 1. Invalidate earlier unverified codes.
        self.repo.delete_unverified_for_email(email).await?;

        // 2. Persist the new code.
        let code = generate_code();
        let now = Utc::now();
        self.repo
            .create(CreateOtp {
                email: email.to_string(),
                otp_code: code.clone(),
                created_at: now,
                expires_at: Some(now + self.lifetime),
            })
            .await?;

        // 3. Deliver it.
        let message = email::otp_message(email, &code, self.lifetime.num_minutes());
        self.email.send(message).await.inspect_err(|e| {
            warn!(%email, error = %e, "Failed to send OTP email");
        })?;

        info!(%email, "OTP issued");
        Ok(())
    }

    /// Find the live code matching `code`. The code is not consumed:
    /// the caller marks it verified in the transaction that acts on it.
    pub async fn check(&self, code: &str) -> MialaResult<OtpVerification> {
        let code = code.trim();

        let Some(otp) = self.repo.find_first_unverified_by_code(code).await? else {
            warn!(otp = %code, "OTP verification failed: no pending code");
            return Err(AuthError::OtpInvalid {
                code: code.to_string(),
            }
            .into());
        };

        if otp.is_expired_at(Utc::now()) {
            warn!(otp = %code, email = %otp.email, "OTP verification failed: expired");
            return Err(AuthError::OtpExpired.into());
        }

        Ok(otp)
    }

    /// Consume a code on its own and return the email it was issued
    /// for. Registration uses [`check`](Self::check) instead and consumes
    /// the code in its finalization transaction.
    pub async fn verify(&self, code: &str) -> MialaResult<String> {
        let otp = self.check(code).await?;
        self.repo.mark_verified(otp.id).await?;
        self.confirm(&otp);
        Ok(otp.email)
    }

    /// Send the verification confirmation in the background once `otp`
    /// has been consumed.
    pub fn confirm(&self, otp: &OtpVerification) {
        info!(email = %otp.email, "OTP verified");

        let sender = Arc::clone(&self.email);
        let message = email::verification_success_message(&otp.email);
        tokio::spawn(async move {
            let recipient = message.recipient.clone();
            if let Err(e) = sender.send(message).await {
                warn!(email = %recipient, error = %e, "Failed to send verification email");
            }
        });
    }

    /// Delete codes that expired before now. Returns the number removed.
    pub async fn cleanup_expired(&self) -> MialaResult<u64> {
        let now = Utc::now();
        if !self.repo.exists_expired_before(now).await? {
            info!("No expired OTP records to delete");
            return Ok(0);
        }

        let deleted = self.repo.delete_expired_before(now).await?;
        info!(deleted, "Deleted expired OTP records");
        Ok(deleted)
    }
}
