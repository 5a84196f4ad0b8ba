//! Schema definitions and migration runner for SurrealDB.
//!
//! Tables are SCHEMAFULL. UUIDs are stored as strings, both as record
//! ids and in reference fields. Users, roles and permissions carry a
//! `deleted` flag instead of being removed.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "identity_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "registration_schema",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1: users, roles, permissions, phone numbers
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD username ON TABLE user TYPE string \
    ASSERT string::len(string::trim($value)) > 0;
DEFINE FIELD email ON TABLE user TYPE string \
    ASSERT string::len(string::trim($value)) > 0;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD firstname ON TABLE user TYPE string;
DEFINE FIELD lastname ON TABLE user TYPE string;
DEFINE FIELD role_ids ON TABLE user TYPE array<string> DEFAULT [];
DEFINE FIELD active ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD deleted ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD last_login_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_username ON TABLE user COLUMNS username UNIQUE;
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD role_type ON TABLE role TYPE string \
    ASSERT $value IN ['USER', 'ADMIN'];
DEFINE FIELD default_role ON TABLE role TYPE bool DEFAULT false;
DEFINE FIELD description ON TABLE role TYPE string;
DEFINE FIELD permission_ids ON TABLE role TYPE array<string> DEFAULT [];
DEFINE FIELD deleted ON TABLE role TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_name ON TABLE role COLUMNS name UNIQUE;
DEFINE INDEX idx_role_default ON TABLE role COLUMNS default_role;

DEFINE TABLE permission SCHEMAFULL;
DEFINE FIELD name ON TABLE permission TYPE string;
DEFINE FIELD permission_type ON TABLE permission TYPE string \
    ASSERT $value IN ['USER', 'ADMIN'];
DEFINE FIELD description ON TABLE permission TYPE string;
DEFINE FIELD deleted ON TABLE permission TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_permission_name ON TABLE permission \
    COLUMNS name UNIQUE;

DEFINE TABLE phone_number SCHEMAFULL;
DEFINE FIELD user_id ON TABLE phone_number TYPE string;
DEFINE FIELD number ON TABLE phone_number TYPE string \
    ASSERT string::len($value) = 11 AND string::is_numeric($value);
DEFINE FIELD network ON TABLE phone_number TYPE string \
    ASSERT $value IN ['MTN', 'Airtel', 'Glo', '9mobile', 'MTEL'];
DEFINE FIELD active ON TABLE phone_number TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE phone_number TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_phone_number_number ON TABLE phone_number \
    COLUMNS number UNIQUE;
DEFINE INDEX idx_phone_number_user ON TABLE phone_number \
    COLUMNS user_id;
";

// -----------------------------------------------------------------------
// Schema v2: pending signups and OTP verifications
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE TABLE signup_request SCHEMAFULL;
DEFINE FIELD email ON TABLE signup_request TYPE string;
DEFINE FIELD username ON TABLE signup_request TYPE string;
DEFINE FIELD firstname ON TABLE signup_request TYPE string;
DEFINE FIELD lastname ON TABLE signup_request TYPE string;
DEFINE FIELD phone_number ON TABLE signup_request TYPE string;
DEFINE FIELD password_hash ON TABLE signup_request TYPE string;
DEFINE FIELD created_at ON TABLE signup_request TYPE datetime;
DEFINE INDEX idx_signup_created_at ON TABLE signup_request \
    COLUMNS created_at;

DEFINE TABLE otp_verification SCHEMAFULL;
DEFINE FIELD email ON TABLE otp_verification TYPE string;
DEFINE FIELD otp_code ON TABLE otp_verification TYPE string;
DEFINE FIELD created_at ON TABLE otp_verification TYPE datetime;
DEFINE FIELD expires_at ON TABLE otp_verification TYPE option<datetime>;
DEFINE FIELD verified ON TABLE otp_verification TYPE bool DEFAULT false;
DEFINE INDEX idx_otp_code ON TABLE otp_verification COLUMNS otp_code;
DEFINE INDEX idx_otp_email ON TABLE otp_verification COLUMNS email;
DEFINE INDEX idx_otp_expires_at ON TABLE otp_verification \
    COLUMNS expires_at;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;
    }

    Ok(())
}

/// Raw DDL of the identity tables, for tests that bypass the runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }

    #[test]
    fn every_soft_deletable_table_has_flag() {
        for table in ["user", "role", "permission"] {
            let ddl = format!("DEFINE FIELD deleted ON TABLE {table} TYPE bool");
            assert!(SCHEMA_V1.contains(&ddl), "{table} lacks deleted flag");
        }
    }
}
