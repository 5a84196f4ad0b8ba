//! Phone number domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::PhoneNumberView;
use crate::network::Network;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhoneNumber {
    pub id: Uuid,
    pub user_id: Uuid,
    pub number: String,
    pub network: Network,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl PhoneNumber {
    pub fn view(&self) -> PhoneNumberView {
        PhoneNumberView {
            id: self.id,
            number: self.number.clone(),
            network: self.network,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePhoneNumber {
    pub number: String,
    pub network: Network,
}
