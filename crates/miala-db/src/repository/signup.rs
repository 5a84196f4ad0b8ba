//! SurrealDB implementation of [`SignupRepository`].
//!
//! Records are keyed by email (`signup_request:⟨email⟩`), so saving a
//! second signup for the same address replaces the first.

use chrono::{DateTime, Utc};
use miala_core::error::MialaResult;
use miala_core::models::signup::PendingSignup;
use miala_core::repository::SignupRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SignupRow {
    email: String,
    username: String,
    firstname: String,
    lastname: String,
    phone_number: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<SignupRow> for PendingSignup {
    fn from(row: SignupRow) -> Self {
        PendingSignup {
            email: row.email,
            username: row.username,
            firstname: row.firstname,
            lastname: row.lastname,
            phone_number: row.phone_number,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

/// SurrealDB implementation of the pending-signup store.
#[derive(Clone)]
pub struct SurrealSignupRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSignupRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SignupRepository for SurrealSignupRepository<C> {
    async fn find_by_email(&self, email: &str) -> MialaResult<Option<PendingSignup>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('signup_request', $email)")
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SignupRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(PendingSignup::from))
    }

    async fn save(&self, signup: PendingSignup) -> MialaResult<()> {
        self.db
            .query(
                "UPSERT type::record('signup_request', $email) CONTENT { \
                 email: $email, username: $username, \
                 firstname: $firstname, lastname: $lastname, \
                 phone_number: $phone_number, \
                 password_hash: $password_hash, \
                 created_at: $created_at } RETURN NONE",
            )
            .bind(("email", signup.email))
            .bind(("username", signup.username))
            .bind(("firstname", signup.firstname))
            .bind(("lastname", signup.lastname))
            .bind(("phone_number", signup.phone_number))
            .bind(("password_hash", signup.password_hash))
            .bind(("created_at", signup.created_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;

        Ok(())
    }

    async fn delete(&self, email: &str) -> MialaResult<()> {
        self.db
            .query("DELETE type::record('signup_request', $email)")
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;

        Ok(())
    }

    async fn find_all_created_before(&self, cutoff: DateTime<Utc>) -> MialaResult<Vec<PendingSignup>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM signup_request \
                 WHERE created_at < $cutoff ORDER BY created_at ASC",
            )
            .bind(("cutoff", cutoff))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SignupRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().map(PendingSignup::from).collect())
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> MialaResult<u64> {
        let mut result = self
            .db
            .query("DELETE signup_request WHERE created_at < $cutoff RETURN BEFORE")
            .bind(("cutoff", cutoff))
            .await
            .map_err(DbError::from)?;

        let removed: Vec<SignupRow> = result.take(0).map_err(DbError::from)?;
        Ok(removed.len() as u64)
    }
}
