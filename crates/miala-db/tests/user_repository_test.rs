//! Integration tests for the user, role, permission and phone-number
//! repositories using in-memory SurrealDB.

use std::collections::BTreeSet;

use chrono::Utc;
use miala_core::error::MialaError;
use miala_core::models::otp::CreateOtp;
use miala_core::models::permission::CreatePermission;
use miala_core::models::phone_number::CreatePhoneNumber;
use miala_core::models::role::{CreateRole, RoleType};
use miala_core::models::signup::PendingSignup;
use miala_core::models::user::{CreateUser, UpdateUser};
use miala_core::network::Network;
use miala_core::repository::{
    OtpRepository, PermissionRepository, PhoneNumberRepository, RoleRepository,
    SignupRepository, UserRepository,
};
use miala_db::repository::{
    SurrealOtpRepository, SurrealPermissionRepository, SurrealPhoneNumberRepository,
    SurrealRoleRepository, SurrealSignupRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    miala_db::run_migrations(&db).await.unwrap();
    db
}

/// Store an unverified code for `email` and return its id.
async fn issue_otp(db: &Surreal<Db>, email: &str, code: &str) -> Uuid {
    let now = Utc::now();
    SurrealOtpRepository::new(db.clone())
        .create(CreateOtp {
            email: email.into(),
            otp_code: code.into(),
            created_at: now,
            expires_at: Some(now + chrono::Duration::minutes(20)),
        })
        .await
        .unwrap()
        .id
}

fn new_user(username: &str, email: &str, number: &str) -> CreateUser {
    CreateUser {
        username: username.into(),
        email: email.into(),
        password_hash: "$argon2id$v=19$fake".into(),
        firstname: "Nova".into(),
        lastname: "Tech".into(),
        role_ids: BTreeSet::new(),
        phone_numbers: vec![CreatePhoneNumber {
            number: number.into(),
            network: Network::Mtn,
        }],
    }
}

#[tokio::test]
async fn create_and_lookup_by_username_or_email() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo
        .create(new_user("novaD123", "a@b.com", "08031234567"))
        .await
        .unwrap();
    assert!(user.active);
    assert_eq!(user.phone_numbers.len(), 1);
    assert_eq!(user.phone_numbers[0].network, Network::Mtn);

    let by_name = repo.get_by_username_or_email("novaD123").await.unwrap();
    let by_email = repo.get_by_username_or_email("a@b.com").await.unwrap();
    assert_eq!(by_name.id, user.id);
    assert_eq!(by_email.id, user.id);

    let err = repo.get_by_username_or_email("NOVAD123").await.unwrap_err();
    assert!(matches!(err, MialaError::NotFound { .. }), "{err:?}");
}

#[tokio::test]
async fn exists_by_username_or_email_matches_either() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);
    repo.create(new_user("novaD123", "a@b.com", "08031234567"))
        .await
        .unwrap();

    assert!(repo.exists_by_username_or_email("novaD123", "x@y.com").await.unwrap());
    assert!(repo.exists_by_username_or_email("other1A", "a@b.com").await.unwrap());
    assert!(!repo.exists_by_username_or_email("other1A", "x@y.com").await.unwrap());
}

#[tokio::test]
async fn soft_deleted_user_is_invisible() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);
    let user = repo
        .create(new_user("novaD123", "a@b.com", "08031234567"))
        .await
        .unwrap();

    repo.delete(user.id).await.unwrap();

    assert!(repo.get_by_id(user.id).await.is_err());
    assert!(repo.get_by_username("novaD123").await.is_err());
    assert!(!repo.exists_by_username_or_email("novaD123", "a@b.com").await.unwrap());
}

#[tokio::test]
async fn update_records_last_login() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);
    let user = repo
        .create(new_user("novaD123", "a@b.com", "08031234567"))
        .await
        .unwrap();
    assert!(user.last_login_at.is_none());

    let now = Utc::now();
    let updated = repo
        .update(
            user.id,
            UpdateUser {
                last_login_at: Some(now),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let recorded = updated.last_login_at.expect("last login should be set");
    assert!((recorded - now).num_milliseconds().abs() < 1000);
}

#[tokio::test]
async fn create_from_signup_removes_pending_signup() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let signups = SurrealSignupRepository::new(db.clone());

    signups
        .save(PendingSignup {
            email: "a@b.com".into(),
            username: "novaD123".into(),
            firstname: "Nova".into(),
            lastname: "Tech".into(),
            phone_number: "08031234567".into(),
            password_hash: "$argon2id$v=19$fake".into(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    let otp_id = issue_otp(&db, "a@b.com", "123456").await;
    let otps = SurrealOtpRepository::new(db.clone());

    let user = users
        .create_from_signup(
            new_user("novaD123", "a@b.com", "08031234567"),
            "a@b.com",
            otp_id,
        )
        .await
        .unwrap();

    assert_eq!(user.username, "novaD123");
    assert!(signups.find_by_email("a@b.com").await.unwrap().is_none());
    assert!(otps.find_first_unverified_by_code("123456").await.unwrap().is_none());
}

#[tokio::test]
async fn consumed_otp_cannot_finalize_again() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let otps = SurrealOtpRepository::new(db.clone());

    let otp_id = issue_otp(&db, "a@b.com", "123456").await;
    otps.mark_verified(otp_id).await.unwrap();

    let err = users
        .create_from_signup(
            new_user("novaD123", "a@b.com", "08031234567"),
            "a@b.com",
            otp_id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MialaError::NotFound { .. }), "{err:?}");
    assert!(users.get_by_username("novaD123").await.is_err());
}

#[tokio::test]
async fn failed_finalization_keeps_pending_signup() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let signups = SurrealSignupRepository::new(db.clone());

    users
        .create(new_user("novaD123", "a@b.com", "08031234567"))
        .await
        .unwrap();
    signups
        .save(PendingSignup {
            email: "c@d.com".into(),
            username: "novaD123".into(),
            firstname: "Nova".into(),
            lastname: "Tech".into(),
            phone_number: "08061234567".into(),
            password_hash: "$argon2id$v=19$fake".into(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    let otp_id = issue_otp(&db, "c@d.com", "654321").await;
    let otps = SurrealOtpRepository::new(db.clone());

    // Duplicate username aborts the transaction, OTP update included.
    let result = users
        .create_from_signup(
            new_user("novaD123", "c@d.com", "08061234567"),
            "c@d.com",
            otp_id,
        )
        .await;
    assert!(result.is_err());
    assert!(signups.find_by_email("c@d.com").await.unwrap().is_some());
    let otp = otps.find_first_unverified_by_code("654321").await.unwrap();
    assert_eq!(otp.map(|o| o.id), Some(otp_id));
}

#[tokio::test]
async fn default_roles_and_permission_grants() {
    let db = setup().await;
    let roles = SurrealRoleRepository::new(db.clone());
    let permissions = SurrealPermissionRepository::new(db);

    let user_role = roles
        .create(CreateRole {
            name: "USER".into(),
            role_type: RoleType::User,
            default_role: true,
            description: "Default user role".into(),
        })
        .await
        .unwrap();
    roles
        .create(CreateRole {
            name: "ADMIN".into(),
            role_type: RoleType::Admin,
            default_role: false,
            description: "Administrator".into(),
        })
        .await
        .unwrap();

    let defaults = roles.list_default().await.unwrap();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, user_role.id);

    let permission = permissions
        .create(CreatePermission {
            name: "phone:write".into(),
            permission_type: RoleType::User,
            description: "Manage own phone numbers".into(),
        })
        .await
        .unwrap();
    roles
        .grant_permission(user_role.id, permission.id)
        .await
        .unwrap();
    // Granting twice keeps the set unique.
    roles
        .grant_permission(user_role.id, permission.id)
        .await
        .unwrap();

    let reloaded = roles.get_by_id(user_role.id).await.unwrap();
    assert_eq!(reloaded.permission_ids.len(), 1);
    assert!(reloaded.permission_ids.contains(&permission.id));

    let fetched = permissions.get_by_ids(&[permission.id]).await.unwrap();
    assert_eq!(fetched[0].name, "phone:write");
}

#[tokio::test]
async fn duplicate_role_name_rejected() {
    let db = setup().await;
    let roles = SurrealRoleRepository::new(db);
    let input = CreateRole {
        name: "USER".into(),
        role_type: RoleType::User,
        default_role: true,
        description: "first".into(),
    };

    roles.create(input.clone()).await.unwrap();
    assert!(roles.create(input).await.is_err());
}

#[tokio::test]
async fn phone_numbers_are_scoped_to_owner() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let phones = SurrealPhoneNumberRepository::new(db);

    let owner = users
        .create(new_user("novaD123", "a@b.com", "08031234567"))
        .await
        .unwrap();
    let other = users
        .create(new_user("otherU12", "c@d.com", "08021234567"))
        .await
        .unwrap();

    let added = phones
        .create(
            owner.id,
            CreatePhoneNumber {
                number: "09051234567".into(),
                network: Network::Glo,
            },
        )
        .await
        .unwrap();

    assert!(phones.exists_for_user(owner.id, "09051234567").await.unwrap());
    assert!(!phones.exists_for_user(other.id, "09051234567").await.unwrap());
    assert_eq!(phones.list_for_user(owner.id).await.unwrap().len(), 2);

    let err = phones.get_for_user(other.id, added.id).await.unwrap_err();
    assert!(matches!(err, MialaError::NotFound { .. }), "{err:?}");

    phones.delete(added.id).await.unwrap();
    assert_eq!(phones.list_for_user(owner.id).await.unwrap().len(), 1);
}
