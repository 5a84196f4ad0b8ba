//! Shared application state: the services handlers call into.

use std::sync::Arc;

use miala_auth::cache::CachingRoleRepository;
use miala_auth::email::{EmailMessage, EmailSender, HttpEmailSender, TracingEmailSender};
use miala_auth::{AuthConfig, AuthService, OtpService, PhoneNumberService};
use miala_core::error::MialaResult;
use miala_db::repository::{
    SurrealOtpRepository, SurrealPermissionRepository, SurrealPhoneNumberRepository,
    SurrealRoleRepository, SurrealSignupRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

use crate::config::ServerConfig;

pub type Auth<E> = AuthService<
    SurrealUserRepository<Any>,
    CachingRoleRepository<SurrealRoleRepository<Any>>,
    SurrealPermissionRepository<Any>,
    SurrealSignupRepository<Any>,
    SurrealOtpRepository<Any>,
    E,
>;

pub type Phones =
    PhoneNumberService<SurrealUserRepository<Any>, SurrealPhoneNumberRepository<Any>>;

/// Email sender chosen at startup.
pub enum Mailer {
    Http(HttpEmailSender),
    Log(TracingEmailSender),
}

impl Mailer {
    pub fn from_config(config: &ServerConfig) -> Self {
        match &config.mail {
            Some(mail) => Mailer::Http(HttpEmailSender::new(mail.clone())),
            None => Mailer::Log(TracingEmailSender),
        }
    }
}

impl EmailSender for Mailer {
    async fn send(&self, message: EmailMessage) -> MialaResult<()> {
        match self {
            Mailer::Http(sender) => sender.send(message).await,
            Mailer::Log(sender) => sender.send(message).await,
        }
    }
}

pub struct AppState<E: EmailSender> {
    pub auth: Arc<Auth<E>>,
    pub phones: Arc<Phones>,
}

impl<E: EmailSender> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            phones: Arc::clone(&self.phones),
        }
    }
}

impl<E: EmailSender> AppState<E> {
    /// Wire the SurrealDB repositories into the services.
    pub fn new(db: &Surreal<Any>, config: AuthConfig, mailer: Arc<E>) -> Self {
        let otp = OtpService::new(
            SurrealOtpRepository::new(db.clone()),
            mailer,
            config.otp_lifetime_secs,
        );
        let phones = PhoneNumberService::new(
            SurrealUserRepository::new(db.clone()),
            SurrealPhoneNumberRepository::new(db.clone()),
            config.max_phone_numbers,
        );
        let roles = CachingRoleRepository::new(
            SurrealRoleRepository::new(db.clone()),
            config.default_roles_cache_size,
            config.default_roles_cache_ttl_secs,
        );
        let auth = AuthService::new(
            SurrealUserRepository::new(db.clone()),
            roles,
            SurrealPermissionRepository::new(db.clone()),
            SurrealSignupRepository::new(db.clone()),
            otp,
            config,
        );

        Self {
            auth: Arc::new(auth),
            phones: Arc::new(phones),
        }
    }
}
