//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Every read on users, roles and
//! permissions skips soft-deleted records.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::MialaResult;
use crate::models::{
    otp::{CreateOtp, OtpVerification},
    permission::{CreatePermission, Permission},
    phone_number::{CreatePhoneNumber, PhoneNumber},
    role::{CreateRole, Role},
    signup::PendingSignup,
    user::{CreateUser, UpdateUser, User},
};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = MialaResult<User>> + Send;
    /// Atomically consume the unverified OTP `otp_id`, create the user
    /// with its phone numbers and delete the pending signup stored under
    /// `signup_email`. Nothing is written when any step fails.
    fn create_from_signup(
        &self,
        input: CreateUser,
        signup_email: &str,
        otp_id: Uuid,
    ) -> impl Future<Output = MialaResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = MialaResult<User>> + Send;
    fn get_by_username(&self, username: &str) -> impl Future<Output = MialaResult<User>> + Send;
    fn get_by_username_or_email(
        &self,
        identifier: &str,
    ) -> impl Future<Output = MialaResult<User>> + Send;
    fn exists_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> impl Future<Output = MialaResult<bool>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = MialaResult<User>> + Send;
    /// Soft delete.
    fn delete(&self, id: Uuid) -> impl Future<Output = MialaResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Roles & permissions
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = MialaResult<Role>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = MialaResult<Role>> + Send;
    /// Unknown or deleted ids are skipped.
    fn get_by_ids(&self, ids: &[Uuid]) -> impl Future<Output = MialaResult<Vec<Role>>> + Send;
    fn list_default(&self) -> impl Future<Output = MialaResult<Vec<Role>>> + Send;
    fn grant_permission(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = MialaResult<()>> + Send;
}

pub trait PermissionRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = MialaResult<Permission>> + Send;
    /// Unknown or deleted ids are skipped.
    fn get_by_ids(
        &self,
        ids: &[Uuid],
    ) -> impl Future<Output = MialaResult<Vec<Permission>>> + Send;
}

// ---------------------------------------------------------------------------
// Phone numbers
// ---------------------------------------------------------------------------

pub trait PhoneNumberRepository: Send + Sync {
    fn create(
        &self,
        user_id: Uuid,
        input: CreatePhoneNumber,
    ) -> impl Future<Output = MialaResult<PhoneNumber>> + Send;
    /// Fails with `NotFound` unless the phone number belongs to `user_id`.
    fn get_for_user(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = MialaResult<PhoneNumber>> + Send;
    fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = MialaResult<Vec<PhoneNumber>>> + Send;
    fn exists_for_user(
        &self,
        user_id: Uuid,
        number: &str,
    ) -> impl Future<Output = MialaResult<bool>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = MialaResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

pub trait SignupRepository: Send + Sync {
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = MialaResult<Option<PendingSignup>>> + Send;
    /// Insert or replace the signup stored under the same email.
    fn save(&self, signup: PendingSignup) -> impl Future<Output = MialaResult<()>> + Send;
    fn delete(&self, email: &str) -> impl Future<Output = MialaResult<()>> + Send;
    fn find_all_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = MialaResult<Vec<PendingSignup>>> + Send;
    /// Delete signups created before `cutoff` in one statement. Returns
    /// the number removed.
    fn delete_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = MialaResult<u64>> + Send;
}

pub trait OtpRepository: Send + Sync {
    fn delete_unverified_for_email(
        &self,
        email: &str,
    ) -> impl Future<Output = MialaResult<()>> + Send;
    fn create(&self, input: CreateOtp) -> impl Future<Output = MialaResult<OtpVerification>> + Send;
    /// Earliest-expiring unverified OTP with this code.
    fn find_first_unverified_by_code(
        &self,
        code: &str,
    ) -> impl Future<Output = MialaResult<Option<OtpVerification>>> + Send;
    fn mark_verified(&self, id: Uuid) -> impl Future<Output = MialaResult<()>> + Send;
    fn exists_expired_before(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = MialaResult<bool>> + Send;
    /// Returns the number of deleted rows.
    fn delete_expired_before(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = MialaResult<u64>> + Send;
}
