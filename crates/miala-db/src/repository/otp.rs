//! SurrealDB implementation of [`OtpRepository`].

use chrono::{DateTime, Utc};
use miala_core::error::MialaResult;
use miala_core::models::otp::{CreateOtp, OtpVerification};
use miala_core::repository::OtpRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct OtpRowWithId {
    record_id: String,
    email: String,
    otp_code: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    verified: bool,
}

impl OtpRowWithId {
    fn try_into_otp(self) -> Result<OtpVerification, DbError> {
        Ok(OtpVerification {
            id: parse_uuid(&self.record_id, "otp")?,
            email: self.email,
            otp_code: self.otp_code,
            created_at: self.created_at,
            expires_at: self.expires_at,
            verified: self.verified,
        })
    }
}

/// Rows with an expiry strictly before `$now`. Rows without expiry are
/// never matched.
const EXPIRED_BEFORE: &str = "expires_at != NONE AND expires_at < $now";

/// SurrealDB implementation of the OTP store.
#[derive(Clone)]
pub struct SurrealOtpRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOtpRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn count_expired(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM otp_verification \
                 WHERE {EXPIRED_BEFORE} GROUP ALL"
            ))
            .bind(("now", now))
            .await?;

        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}

impl<C: Connection> OtpRepository for SurrealOtpRepository<C> {
    async fn delete_unverified_for_email(&self, email: &str) -> MialaResult<()> {
        self.db
            .query("DELETE otp_verification WHERE email = $email AND verified = false")
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;

        Ok(())
    }

    async fn create(&self, input: CreateOtp) -> MialaResult<OtpVerification> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('otp_verification', $id) SET \
                 email = $email, otp_code = $otp_code, \
                 created_at = $created_at, expires_at = $expires_at, \
                 verified = false",
            )
            .bind(("id", id_str.clone()))
            .bind(("email", input.email.clone()))
            .bind(("otp_code", input.otp_code.clone()))
            .bind(("created_at", input.created_at))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;
        result
            .check()
            .map_err(DbError::from_check)?;

        Ok(OtpVerification {
            id,
            email: input.email,
            otp_code: input.otp_code,
            created_at: input.created_at,
            expires_at: input.expires_at,
            verified: false,
        })
    }

    async fn find_first_unverified_by_code(&self, code: &str) -> MialaResult<Option<OtpVerification>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM otp_verification \
                 WHERE otp_code = $code AND verified = false \
                 ORDER BY expires_at ASC LIMIT 1",
            )
            .bind(("code", code.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OtpRowWithId> = result.take(0).map_err(DbError::from)?;
        let otp = rows.into_iter().next().map(OtpRowWithId::try_into_otp).transpose()?;
        Ok(otp)
    }

    async fn mark_verified(&self, id: Uuid) -> MialaResult<()> {
        self.db
            .query("UPDATE type::record('otp_verification', $id) SET verified = true RETURN NONE")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;

        Ok(())
    }

    async fn exists_expired_before(&self, now: DateTime<Utc>) -> MialaResult<bool> {
        Ok(self.count_expired(now).await? > 0)
    }

    async fn delete_expired_before(&self, now: DateTime<Utc>) -> MialaResult<u64> {
        let total = self.count_expired(now).await?;
        if total == 0 {
            return Ok(0);
        }

        self.db
            .query(format!("DELETE otp_verification WHERE {EXPIRED_BEFORE}"))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;

        debug!(deleted = total, "Deleted expired OTP verifications");
        Ok(total)
    }
}
