//! Phone-number management for the authenticated user.
//!
//! Every operation reloads the target user and requires it to be the
//! request principal.

use miala_core::error::{MialaError, MialaResult};
use miala_core::models::phone_number::{CreatePhoneNumber, PhoneNumber};
use miala_core::models::user::User;
use miala_core::network::detect_network;
use miala_core::repository::{PhoneNumberRepository, UserRepository};
use tracing::{info, warn};
use uuid::Uuid;

use crate::context;
use crate::input::{self, PhoneNumberRequest};

pub struct PhoneNumberService<U: UserRepository, P: PhoneNumberRepository> {
    users: U,
    phones: P,
    max_per_user: usize,
}

impl<U: UserRepository, P: PhoneNumberRepository> PhoneNumberService<U, P> {
    pub fn new(users: U, phones: P, max_per_user: usize) -> Self {
        Self {
            users,
            phones,
            max_per_user,
        }
    }

    pub async fn add_phone_number(
        &self,
        user_id: Uuid,
        request: PhoneNumberRequest,
    ) -> MialaResult<PhoneNumber> {
        input::validate(&request)?;
        let user = self.authorize(user_id).await?;
        let number = request.number;

        let network = detect_network(&number)?;

        if self.phones.exists_for_user(user.id, &number).await? {
            return Err(MialaError::AlreadyExists {
                message: format!("Phone number {number} already exists for this user"),
            });
        }

        let held = self.phones.list_for_user(user.id).await?.len();
        if held >= self.max_per_user {
            return Err(MialaError::BusinessRule {
                message: format!(
                    "Maximum of {} phone numbers allowed per user",
                    self.max_per_user
                ),
            });
        }

        let phone = self
            .phones
            .create(user.id, CreatePhoneNumber { number, network })
            .await?;
        info!(username = %user.username, network = %phone.network, "Phone number added");
        Ok(phone)
    }

    pub async fn remove_phone_number(&self, user_id: Uuid, phone_id: Uuid) -> MialaResult<()> {
        let user = self.authorize(user_id).await?;

        let phone = self.phones.get_for_user(user.id, phone_id).await?;
        self.phones.delete(phone.id).await?;

        info!(username = %user.username, "Phone number removed");
        Ok(())
    }

    pub async fn list_phone_numbers(&self, user_id: Uuid) -> MialaResult<Vec<PhoneNumber>> {
        let user = self.authorize(user_id).await?;
        self.phones.list_for_user(user.id).await
    }

    /// Load `user_id` and check it is the authenticated principal.
    async fn authorize(&self, user_id: Uuid) -> MialaResult<User> {
        let principal = context::authenticated_principal()?;
        let user = self.users.get_by_id(user_id).await?;

        if principal.username != user.username {
            warn!(
                principal = %principal.username,
                target = %user.username,
                "Cross user operation detected"
            );
            return Err(MialaError::AuthorizationDenied {
                reason: "Cross user operation detected".into(),
            });
        }
        Ok(user)
    }
}
