//! User domain model.

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::phone_number::{CreatePhoneNumber, PhoneNumber};
use crate::network::Network;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub firstname: String,
    pub lastname: String,
    pub role_ids: BTreeSet<Uuid>,
    pub phone_numbers: Vec<PhoneNumber>,
    pub active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Public projection of the user, with timestamps rendered in the
    /// given offset.
    pub fn view(&self, offset: FixedOffset) -> UserView {
        UserView {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            firstname: self.firstname.clone(),
            lastname: self.lastname.clone(),
            phone_numbers: self.phone_numbers.iter().map(PhoneNumber::view).collect(),
            active: self.active,
            last_login_at: self.last_login_at.map(|t| t.with_timezone(&offset)),
            created_on: self.created_at.with_timezone(&offset),
            updated_on: self.updated_at.with_timezone(&offset),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    /// Already hashed; repositories never see raw passwords.
    pub password_hash: String,
    pub firstname: String,
    pub lastname: String,
    pub role_ids: BTreeSet<Uuid>,
    pub phone_numbers: Vec<CreatePhoneNumber>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub password_hash: Option<String>,
    pub active: Option<bool>,
    pub role_ids: Option<BTreeSet<Uuid>>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumberView {
    pub id: Uuid,
    pub number: String,
    pub network: Network,
}

/// User as returned to API clients. Never carries the password hash.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub phone_numbers: Vec<PhoneNumberView>,
    pub active: bool,
    pub last_login_at: Option<DateTime<FixedOffset>>,
    pub created_on: DateTime<FixedOffset>,
    pub updated_on: DateTime<FixedOffset>,
}
