//! Integration tests for phone-number management using in-memory
//! SurrealDB.

mod common;

use std::collections::BTreeSet;

use miala_auth::PhoneNumberService;
use miala_auth::context;
use miala_auth::input::PhoneNumberRequest;
use miala_core::error::MialaError;
use miala_core::models::phone_number::CreatePhoneNumber;
use miala_core::models::user::{CreateUser, User};
use miala_core::network::Network;
use miala_core::repository::UserRepository;
use miala_db::repository::{SurrealPhoneNumberRepository, SurrealUserRepository};
use surrealdb::engine::local::Db;
use uuid::Uuid;

type Phones = PhoneNumberService<SurrealUserRepository<Db>, SurrealPhoneNumberRepository<Db>>;

async fn setup() -> (Phones, User, User) {
    let db = common::database().await;
    let users = SurrealUserRepository::new(db.clone());

    let owner = users
        .create(new_user("novaD123", "a@b.com", "08031234567"))
        .await
        .unwrap();
    let other = users
        .create(new_user("otherU12", "c@d.com", "08021234567"))
        .await
        .unwrap();

    let service = PhoneNumberService::new(users, SurrealPhoneNumberRepository::new(db), 3);
    (service, owner, other)
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

fn number(n: &str) -> PhoneNumberRequest {
    PhoneNumberRequest { number: n.into() }
}

#[tokio::test]
async fn owner_can_add_list_and_remove() {
    let (service, owner, _) = setup().await;

    context::scope(owner.clone(), async {
        let added = service
            .add_phone_number(owner.id, number("09151234567"))
            .await
            .unwrap();
        assert_eq!(added.network, Network::Glo);

        let listed = service.list_phone_numbers(owner.id).await.unwrap();
        assert_eq!(listed.len(), 2);

        service.remove_phone_number(owner.id, added.id).await.unwrap();
        assert_eq!(service.list_phone_numbers(owner.id).await.unwrap().len(), 1);
    })
    .await;
}

#[tokio::test]
async fn fourth_number_is_refused() {
    let (service, owner, _) = setup().await;

    context::scope(owner.clone(), async {
        service
            .add_phone_number(owner.id, number("08061234567"))
            .await
            .unwrap();
        service
            .add_phone_number(owner.id, number("07011234567"))
            .await
            .unwrap();

        let err = service
            .add_phone_number(owner.id, number("08091234567"))
            .await
            .unwrap_err();
        assert!(matches!(err, MialaError::BusinessRule { .. }), "{err:?}");
        assert_eq!(
            err.to_string(),
            "Maximum of 3 phone numbers allowed per user"
        );
    })
    .await;
}

#[tokio::test]
async fn duplicate_and_unknown_numbers_are_refused() {
    let (service, owner, _) = setup().await;

    context::scope(owner.clone(), async {
        let err = service
            .add_phone_number(owner.id, number("08031234567"))
            .await
            .unwrap_err();
        assert!(matches!(err, MialaError::AlreadyExists { .. }), "{err:?}");

        // Well-formed but no carrier owns the 0800 prefix.
        let err = service
            .add_phone_number(owner.id, number("08001234567"))
            .await
            .unwrap_err();
        assert!(matches!(err, MialaError::Validation { .. }), "{err:?}");
    })
    .await;
}

#[tokio::test]
async fn cross_user_operations_are_denied() {
    let (service, owner, other) = setup().await;

    context::scope(other.clone(), async {
        let err = service.list_phone_numbers(owner.id).await.unwrap_err();
        assert!(matches!(err, MialaError::AuthorizationDenied { .. }), "{err:?}");

        let err = service
            .add_phone_number(owner.id, number("09151234567"))
            .await
            .unwrap_err();
        assert!(matches!(err, MialaError::AuthorizationDenied { .. }), "{err:?}");
    })
    .await;
}

#[tokio::test]
async fn removing_someone_elses_number_is_not_found() {
    let (service, owner, other) = setup().await;
    let foreign = other.phone_numbers[0].id;

    context::scope(owner.clone(), async {
        let err = service
            .remove_phone_number(owner.id, foreign)
            .await
            .unwrap_err();
        assert!(matches!(err, MialaError::NotFound { .. }), "{err:?}");

        let err = service
            .remove_phone_number(owner.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, MialaError::NotFound { .. }), "{err:?}");
    })
    .await;
}

#[tokio::test]
async fn requires_an_authenticated_principal() {
    let (service, owner, _) = setup().await;

    let err = service.list_phone_numbers(owner.id).await.unwrap_err();
    assert!(matches!(err, MialaError::Unauthorized { .. }), "{err:?}");
}
