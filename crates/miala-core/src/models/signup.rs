//! Pending (not yet OTP-verified) registrations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A staged registration, keyed by email. A newer submission for the
/// same email replaces the older one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingSignup {
    pub email: String,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub phone_number: String,
    /// Argon2id hash computed when the signup was submitted.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
