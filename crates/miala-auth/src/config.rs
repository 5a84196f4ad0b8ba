//! Authentication configuration.

use chrono::{FixedOffset, Offset, Utc};

/// Configuration for the authentication services.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared HS256 signing secret.
    pub jwt_secret: String,
    /// JWT issuer (`iss` claim), checked on decode.
    pub jwt_issuer: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes).
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 604_800 = 7 days).
    pub refresh_token_lifetime_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id.
    pub pepper: Option<String>,
    /// OTP validity in seconds (default: 1200 = 20 minutes).
    pub otp_lifetime_secs: u64,
    /// Age after which a pending signup is discarded (default: 24h).
    pub signup_retention_secs: u64,
    pub max_phone_numbers: usize,
    pub default_roles_cache_ttl_secs: u64,
    pub default_roles_cache_size: usize,
    /// Offset used when rendering timestamps to clients
    /// (default: +01:00, Africa/Lagos).
    pub login_utc_offset_secs: i32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_issuer: "miala".into(),
            access_token_lifetime_secs: 900,
            refresh_token_lifetime_secs: 604_800,
            pepper: None,
            otp_lifetime_secs: 1200,
            signup_retention_secs: 86_400,
            max_phone_numbers: 3,
            default_roles_cache_ttl_secs: 86_400,
            default_roles_cache_size: 10,
            login_utc_offset_secs: 3600,
        }
    }
}

impl AuthConfig {
    /// Offset for client-facing timestamps, falling back to UTC when the
    /// configured value is out of range.
    pub fn display_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.login_utc_offset_secs).unwrap_or(Utc.fix())
    }
}
