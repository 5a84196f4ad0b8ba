//! SurrealDB repository implementations.

mod otp;
mod permission;
mod phone_number;
mod role;
mod signup;
mod user;

pub use otp::SurrealOtpRepository;
pub use permission::SurrealPermissionRepository;
pub use phone_number::SurrealPhoneNumberRepository;
pub use role::SurrealRoleRepository;
pub use signup::SurrealSignupRepository;
pub use user::SurrealUserRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// `SELECT` with the record id over records of `source` that are not
/// soft-deleted and match `predicate`.
fn select_live(source: &str, predicate: &str) -> String {
    format!(
        "SELECT meta::id(id) AS record_id, * FROM {source} \
         WHERE deleted = false AND ({predicate})"
    )
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::InvalidRecord(format!("invalid {what} UUID: {e}")))
}

fn parse_uuids<'a>(
    values: impl IntoIterator<Item = &'a String>,
    what: &str,
) -> Result<std::collections::BTreeSet<Uuid>, DbError> {
    values.into_iter().map(|v| parse_uuid(v, what)).collect()
}

fn uuid_strings<'a>(ids: impl IntoIterator<Item = &'a Uuid>) -> Vec<String> {
    ids.into_iter().map(Uuid::to_string).collect()
}
