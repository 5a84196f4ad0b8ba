//! Shared fixtures for the auth integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use miala_auth::cache::CachingRoleRepository;
use miala_auth::email::{EmailMessage, EmailSender};
use miala_auth::{AuthConfig, AuthService, OtpService};
use miala_core::error::{MialaError, MialaResult};
use miala_db::repository::{
    SurrealOtpRepository, SurrealPermissionRepository, SurrealRoleRepository,
    SurrealSignupRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

pub type Service<E> = AuthService<
    SurrealUserRepository<Db>,
    CachingRoleRepository<SurrealRoleRepository<Db>>,
    SurrealPermissionRepository<Db>,
    SurrealSignupRepository<Db>,
    SurrealOtpRepository<Db>,
    E,
>;

/// Keeps every message it is asked to send.
#[derive(Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingEmailSender {
    pub fn messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Code from the most recent OTP email sent to `recipient`.
    pub fn last_code_for(&self, recipient: &str) -> String {
        let message = self
            .messages()
            .into_iter()
            .rev()
            .find(|m| m.recipient == recipient && m.subject == "Miala OTP")
            .expect("no OTP email sent");
        let end = message.html_body.find("</h1>").expect("code heading");
        message.html_body[end - 6..end].to_string()
    }
}

impl EmailSender for RecordingEmailSender {
    async fn send(&self, message: EmailMessage) -> MialaResult<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Rejects every message.
pub struct FailingEmailSender;

impl EmailSender for FailingEmailSender {
    async fn send(&self, _message: EmailMessage) -> MialaResult<()> {
        Err(MialaError::EmailDelivery("smtp unavailable".into()))
    }
}

pub fn test_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-test-secret-0123456789abcdef".into(),
        jwt_issuer: "miala-test".into(),
        ..AuthConfig::default()
    }
}

pub async fn database() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    miala_db::run_migrations(&db).await.unwrap();
    db
}

pub fn service<E: EmailSender>(db: &Surreal<Db>, email: Arc<E>, config: AuthConfig) -> Service<E> {
    let otp = OtpService::new(
        SurrealOtpRepository::new(db.clone()),
        email,
        config.otp_lifetime_secs,
    );
    AuthService::new(
        SurrealUserRepository::new(db.clone()),
        CachingRoleRepository::new(
            SurrealRoleRepository::new(db.clone()),
            config.default_roles_cache_size,
            config.default_roles_cache_ttl_secs,
        ),
        SurrealPermissionRepository::new(db.clone()),
        SurrealSignupRepository::new(db.clone()),
        otp,
        config,
    )
}
