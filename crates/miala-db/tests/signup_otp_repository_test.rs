//! Integration tests for the pending-signup and OTP stores using
//! in-memory SurrealDB.

use chrono::{Duration, Utc};
use miala_core::models::otp::CreateOtp;
use miala_core::models::signup::PendingSignup;
use miala_core::repository::{OtpRepository, SignupRepository};
use miala_db::repository::{SurrealOtpRepository, SurrealSignupRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    miala_db::run_migrations(&db).await.unwrap();
    db
}

fn signup(email: &str, username: &str) -> PendingSignup {
    PendingSignup {
        email: email.into(),
        username: username.into(),
        firstname: "Nova".into(),
        lastname: "Tech".into(),
        phone_number: "08031234567".into(),
        password_hash: "$argon2id$v=19$fake".into(),
        created_at: Utc::now(),
    }
}

fn otp(email: &str, code: &str, expires_in: Option<Duration>) -> CreateOtp {
    let now = Utc::now();
    CreateOtp {
        email: email.into(),
        otp_code: code.into(),
        created_at: now,
        expires_at: expires_in.map(|d| now + d),
    }
}

#[tokio::test]
async fn latest_signup_for_email_wins() {
    let db = setup().await;
    let repo = SurrealSignupRepository::new(db);

    repo.save(signup("a@b.com", "firstU1")).await.unwrap();
    repo.save(signup("a@b.com", "secondU2")).await.unwrap();

    let stored = repo.find_by_email("a@b.com").await.unwrap().unwrap();
    assert_eq!(stored.username, "secondU2");
}

#[tokio::test]
async fn find_all_created_before_uses_cutoff() {
    let db = setup().await;
    let repo = SurrealSignupRepository::new(db);

    let mut stale = signup("old@b.com", "oldUser1");
    stale.created_at = Utc::now() - Duration::hours(25);
    repo.save(stale).await.unwrap();
    repo.save(signup("new@b.com", "newUser1")).await.unwrap();

    let cutoff = Utc::now() - Duration::hours(24);
    let found = repo.find_all_created_before(cutoff).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].email, "old@b.com");

    repo.delete("old@b.com").await.unwrap();
    assert!(repo.find_by_email("old@b.com").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_created_before_skips_resubmitted_signups() {
    let db = setup().await;
    let repo = SurrealSignupRepository::new(db);

    for (email, username) in [("old@b.com", "oldUser1"), ("back@b.com", "backUser1")] {
        let mut stale = signup(email, username);
        stale.created_at = Utc::now() - Duration::hours(25);
        repo.save(stale).await.unwrap();
    }
    // Re-submission resets created_at.
    repo.save(signup("back@b.com", "backUser1")).await.unwrap();

    let cutoff = Utc::now() - Duration::hours(24);
    assert_eq!(repo.delete_created_before(cutoff).await.unwrap(), 1);
    assert!(repo.find_by_email("old@b.com").await.unwrap().is_none());
    assert!(repo.find_by_email("back@b.com").await.unwrap().is_some());
    assert_eq!(repo.delete_created_before(cutoff).await.unwrap(), 0);
}

#[tokio::test]
async fn first_unverified_is_earliest_expiring() {
    let db = setup().await;
    let repo = SurrealOtpRepository::new(db);

    repo.create(otp("late@b.com", "123456", Some(Duration::minutes(20))))
        .await
        .unwrap();
    repo.create(otp("early@b.com", "123456", Some(Duration::minutes(5))))
        .await
        .unwrap();

    let found = repo.find_first_unverified_by_code("123456").await.unwrap().unwrap();
    assert_eq!(found.email, "early@b.com");

    repo.mark_verified(found.id).await.unwrap();
    let next = repo.find_first_unverified_by_code("123456").await.unwrap().unwrap();
    assert_eq!(next.email, "late@b.com");

    assert!(repo.find_first_unverified_by_code("999999").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_unverified_only_touches_that_email() {
    let db = setup().await;
    let repo = SurrealOtpRepository::new(db);

    repo.create(otp("a@b.com", "111111", Some(Duration::minutes(20))))
        .await
        .unwrap();
    repo.create(otp("c@d.com", "222222", Some(Duration::minutes(20))))
        .await
        .unwrap();

    repo.delete_unverified_for_email("a@b.com").await.unwrap();

    assert!(repo.find_first_unverified_by_code("111111").await.unwrap().is_none());
    assert!(repo.find_first_unverified_by_code("222222").await.unwrap().is_some());
}

#[tokio::test]
async fn expired_cleanup_counts_and_skips_rows_without_expiry() {
    let db = setup().await;
    let repo = SurrealOtpRepository::new(db);
    let now = Utc::now();

    assert!(!repo.exists_expired_before(now).await.unwrap());
    assert_eq!(repo.delete_expired_before(now).await.unwrap(), 0);

    repo.create(otp("a@b.com", "111111", Some(Duration::minutes(-1))))
        .await
        .unwrap();
    repo.create(otp("c@d.com", "222222", Some(Duration::minutes(-2))))
        .await
        .unwrap();
    repo.create(otp("e@f.com", "333333", Some(Duration::minutes(20))))
        .await
        .unwrap();
    repo.create(otp("g@h.com", "444444", None)).await.unwrap();

    let now = Utc::now();
    assert!(repo.exists_expired_before(now).await.unwrap());
    assert_eq!(repo.delete_expired_before(now).await.unwrap(), 2);
    assert!(!repo.exists_expired_before(now).await.unwrap());

    assert!(repo.find_first_unverified_by_code("333333").await.unwrap().is_some());
    assert!(repo.find_first_unverified_by_code("444444").await.unwrap().is_some());
}
