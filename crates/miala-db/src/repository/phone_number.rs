//! SurrealDB implementation of [`PhoneNumberRepository`].

use chrono::{DateTime, Utc};
use miala_core::error::MialaResult;
use miala_core::models::phone_number::{CreatePhoneNumber, PhoneNumber};
use miala_core::network::Network;
use miala_core::repository::PhoneNumberRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PhoneNumberRowWithId {
    record_id: String,
    user_id: String,
    number: String,
    network: String,
    active: bool,
    created_at: DateTime<Utc>,
}

impl PhoneNumberRowWithId {
    fn try_into_phone_number(self) -> Result<PhoneNumber, DbError> {
        let network = Network::parse(&self.network)
            .ok_or_else(|| DbError::InvalidRecord(format!("unknown network: {}", self.network)))?;
        Ok(PhoneNumber {
            id: parse_uuid(&self.record_id, "phone number")?,
            user_id: parse_uuid(&self.user_id, "user")?,
            number: self.number,
            network,
            active: self.active,
            created_at: self.created_at,
        })
    }
}

/// Load all phone numbers owned by `user_id`, oldest first.
pub(super) async fn phone_numbers_of<C: Connection>(
    db: &Surreal<C>,
    user_id: Uuid,
) -> Result<Vec<PhoneNumber>, DbError> {
    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, * FROM phone_number \
             WHERE user_id = $user_id ORDER BY created_at ASC",
        )
        .bind(("user_id", user_id.to_string()))
        .await?;

    let rows: Vec<PhoneNumberRowWithId> = result.take(0)?;
    rows.into_iter()
        .map(PhoneNumberRowWithId::try_into_phone_number)
        .collect()
}

/// SurrealDB implementation of the PhoneNumber repository.
#[derive(Clone)]
pub struct SurrealPhoneNumberRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPhoneNumberRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PhoneNumberRepository for SurrealPhoneNumberRepository<C> {
    async fn create(&self, user_id: Uuid, input: CreatePhoneNumber) -> MialaResult<PhoneNumber> {
        let id = Uuid::new_v4();

        let result = self
            .db
            .query(
                "CREATE type::record('phone_number', $id) SET \
                 user_id = $user_id, number = $number, \
                 network = $network, active = true",
            )
            .bind(("id", id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("number", input.number))
            .bind(("network", input.network.as_str().to_string()))
            .await
            .map_err(DbError::from)?;
        result
            .check()
            .map_err(DbError::from_check)?;

        Ok(self.get_for_user(user_id, id).await?)
    }

    async fn get_for_user(&self, user_id: Uuid, id: Uuid) -> MialaResult<PhoneNumber> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('phone_number', $id) \
                 WHERE user_id = $user_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PhoneNumberRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("phone_number", id_str))?;

        Ok(row.try_into_phone_number()?)
    }

    async fn list_for_user(&self, user_id: Uuid) -> MialaResult<Vec<PhoneNumber>> {
        Ok(phone_numbers_of(&self.db, user_id).await?)
    }

    async fn exists_for_user(&self, user_id: Uuid, number: &str) -> MialaResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM phone_number \
                 WHERE user_id = $user_id AND number = $number GROUP ALL",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("number", number.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn delete(&self, id: Uuid) -> MialaResult<()> {
        self.db
            .query("DELETE type::record('phone_number', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;

        Ok(())
    }
}
