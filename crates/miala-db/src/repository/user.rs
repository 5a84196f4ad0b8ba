//! SurrealDB implementation of [`UserRepository`].
//!
//! Phone numbers live in their own table and are attached on every read.
//! Passwords arrive already hashed.

use chrono::{DateTime, Utc};
use miala_core::error::MialaResult;
use miala_core::models::user::{CreateUser, UpdateUser, User};
use miala_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use super::phone_number::phone_numbers_of;
use super::{CountRow, parse_uuid, parse_uuids, select_live, uuid_strings};
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    username: String,
    email: String,
    password_hash: String,
    firstname: String,
    lastname: String,
    role_ids: Vec<String>,
    active: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid(&self.record_id, "user")?,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            firstname: self.firstname,
            lastname: self.lastname,
            role_ids: parse_uuids(&self.role_ids, "role")?,
            phone_numbers: Vec::new(),
            active: self.active,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Statement inserting one user record; shared by plain creation and
/// signup finalization.
const CREATE_USER: &str = "\
CREATE type::record('user', $id) SET \
    username = $username, email = $email, \
    password_hash = $password_hash, \
    firstname = $firstname, lastname = $lastname, \
    role_ids = $role_ids, active = true, deleted = false;";

/// Marks the OTP verified, aborting the transaction when it was already
/// consumed.
const CONSUME_OTP: &str = "\
LET $consumed = (UPDATE type::record('otp_verification', $otp_id) \
    SET verified = true WHERE verified = false RETURN AFTER);
IF array::len($consumed) = 0 { THROW 'OTP already consumed'; };";

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Insert the user and its phone numbers inside one transaction.
    /// With `finalize`, the same transaction also consumes the OTP and
    /// deletes the pending signup.
    async fn insert(
        &self,
        id: Uuid,
        input: CreateUser,
        finalize: Option<(&str, Uuid)>,
    ) -> Result<(), DbError> {
        let mut statements = vec!["BEGIN TRANSACTION;".to_string()];
        if finalize.is_some() {
            statements.push(CONSUME_OTP.to_string());
        }
        statements.push(CREATE_USER.to_string());
        for i in 0..input.phone_numbers.len() {
            statements.push(format!(
                "CREATE type::record('phone_number', $phone_id_{i}) SET \
                 user_id = $id, number = $number_{i}, \
                 network = $network_{i}, active = true;"
            ));
        }
        if finalize.is_some() {
            statements.push("DELETE type::record('signup_request', $signup_email);".into());
        }
        statements.push("COMMIT TRANSACTION;".into());

        let query = statements.join("\n");
        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("username", input.username))
            .bind(("email", input.email))
            .bind(("password_hash", input.password_hash))
            .bind(("firstname", input.firstname))
            .bind(("lastname", input.lastname))
            .bind(("role_ids", uuid_strings(&input.role_ids)));

        for (i, phone) in input.phone_numbers.into_iter().enumerate() {
            builder = builder
                .bind((format!("phone_id_{i}"), Uuid::new_v4().to_string()))
                .bind((format!("number_{i}"), phone.number))
                .bind((format!("network_{i}"), phone.network.as_str().to_string()));
        }
        if let Some((email, otp_id)) = finalize {
            builder = builder
                .bind(("signup_email", email.to_string()))
                .bind(("otp_id", otp_id.to_string()));
        }

        let mut response = builder.await?;
        let errors = response.take_errors();
        if !errors.is_empty() {
            return Err(DbError::from_statement_errors(errors));
        }

        Ok(())
    }

    async fn find_one(
        &self,
        predicate: &str,
        bindings: Vec<(&'static str, String)>,
        not_found_id: String,
    ) -> Result<User, DbError> {
        let query = select_live("user", predicate);
        let mut builder = self.db.query(&query);
        for binding in bindings {
            builder = builder.bind(binding);
        }
        let mut result = builder.await?;

        let rows: Vec<UserRowWithId> = result.take(0)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", not_found_id))?;

        let mut user = row.try_into_user()?;
        user.phone_numbers = phone_numbers_of(&self.db, user.id).await?;
        Ok(user)
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> MialaResult<User> {
        let id = Uuid::new_v4();
        self.insert(id, input, None).await?;
        self.get_by_id(id).await
    }

    async fn create_from_signup(
        &self,
        input: CreateUser,
        signup_email: &str,
        otp_id: Uuid,
    ) -> MialaResult<User> {
        let id = Uuid::new_v4();
        self.insert(id, input, Some((signup_email, otp_id))).await?;
        info!(user_id = %id, "User finalized from pending signup");
        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> MialaResult<User> {
        let id_str = id.to_string();
        Ok(self
            .find_one(
                "id = type::record('user', $id)",
                vec![("id", id_str.clone())],
                id_str,
            )
            .await?)
    }

    async fn get_by_username(&self, username: &str) -> MialaResult<User> {
        Ok(self
            .find_one(
                "username = $username",
                vec![("username", username.to_string())],
                format!("username={username}"),
            )
            .await?)
    }

    async fn get_by_username_or_email(&self, identifier: &str) -> MialaResult<User> {
        Ok(self
            .find_one(
                "username = $identifier OR email = $identifier",
                vec![("identifier", identifier.to_string())],
                format!("identifier={identifier}"),
            )
            .await?)
    }

    async fn exists_by_username_or_email(&self, username: &str, email: &str) -> MialaResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM user \
                 WHERE deleted = false \
                 AND (username = $username OR email = $email) GROUP ALL",
            )
            .bind(("username", username.to_string()))
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> MialaResult<User> {
        let mut sets = Vec::new();
        if input.firstname.is_some() {
            sets.push("firstname = $firstname");
        }
        if input.lastname.is_some() {
            sets.push("lastname = $lastname");
        }
        if input.password_hash.is_some() {
            sets.push("password_hash = $password_hash");
        }
        if input.active.is_some() {
            sets.push("active = $active");
        }
        if input.role_ids.is_some() {
            sets.push("role_ids = $role_ids");
        }
        if input.last_login_at.is_some() {
            sets.push("last_login_at = $last_login_at");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {} \
             WHERE deleted = false RETURN NONE",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));

        if let Some(firstname) = input.firstname {
            builder = builder.bind(("firstname", firstname));
        }
        if let Some(lastname) = input.lastname {
            builder = builder.bind(("lastname", lastname));
        }
        if let Some(password_hash) = input.password_hash {
            builder = builder.bind(("password_hash", password_hash));
        }
        if let Some(active) = input.active {
            builder = builder.bind(("active", active));
        }
        if let Some(ref role_ids) = input.role_ids {
            builder = builder.bind(("role_ids", uuid_strings(role_ids)));
        }
        if let Some(last_login_at) = input.last_login_at {
            builder = builder.bind(("last_login_at", last_login_at));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;

        self.get_by_id(id).await
    }

    async fn delete(&self, id: Uuid) -> MialaResult<()> {
        self.db
            .query(
                "UPDATE type::record('user', $id) SET \
                 deleted = true, active = false, updated_at = time::now() \
                 WHERE deleted = false RETURN NONE",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;

        Ok(())
    }
}
