//! Server configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use miala_auth::AuthConfig;
use miala_auth::email::MailApiConfig;
use miala_auth::sweeper::{OTP_SWEEP_PERIOD, SIGNUP_SWEEP_PERIOD};
use miala_db::DbConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub db: DbConfig,
    pub auth: AuthConfig,
    /// Transactional mail API. Emails are only logged when unset.
    pub mail: Option<MailApiConfig>,
    pub otp_sweep_period: Duration,
    pub signup_sweep_period: Duration,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Unset keys take
    /// their defaults; `JWT_SECRET` is required.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let defaults = AuthConfig::default();
        let Some(jwt_secret) = var("JWT_SECRET") else {
            bail!("JWT_SECRET must be set");
        };

        let auth = AuthConfig {
            jwt_secret,
            jwt_issuer: var("JWT_ISSUER").unwrap_or(defaults.jwt_issuer),
            access_token_lifetime_secs: parse_or(
                var("ACCESS_TOKEN_TTL_SECS"),
                "ACCESS_TOKEN_TTL_SECS",
                defaults.access_token_lifetime_secs,
            )?,
            refresh_token_lifetime_secs: parse_or(
                var("REFRESH_TOKEN_TTL_SECS"),
                "REFRESH_TOKEN_TTL_SECS",
                defaults.refresh_token_lifetime_secs,
            )?,
            pepper: var("PASSWORD_PEPPER"),
            otp_lifetime_secs: parse_or(
                var("OTP_TTL_SECS"),
                "OTP_TTL_SECS",
                defaults.otp_lifetime_secs,
            )?,
            signup_retention_secs: parse_or(
                var("SIGNUP_RETENTION_SECS"),
                "SIGNUP_RETENTION_SECS",
                defaults.signup_retention_secs,
            )?,
            max_phone_numbers: parse_or(
                var("MAX_PHONE_NUMBERS"),
                "MAX_PHONE_NUMBERS",
                defaults.max_phone_numbers,
            )?,
            default_roles_cache_ttl_secs: parse_or(
                var("DEFAULT_ROLES_CACHE_TTL_SECS"),
                "DEFAULT_ROLES_CACHE_TTL_SECS",
                defaults.default_roles_cache_ttl_secs,
            )?,
            default_roles_cache_size: parse_or(
                var("DEFAULT_ROLES_CACHE_SIZE"),
                "DEFAULT_ROLES_CACHE_SIZE",
                defaults.default_roles_cache_size,
            )?,
            login_utc_offset_secs: parse_or(
                var("LOGIN_UTC_OFFSET_SECS"),
                "LOGIN_UTC_OFFSET_SECS",
                defaults.login_utc_offset_secs,
            )?,
        };

        let db_defaults = DbConfig::default();
        let db = DbConfig {
            url: var("SURREAL_URL").unwrap_or(db_defaults.url),
            namespace: var("SURREAL_NS").unwrap_or(db_defaults.namespace),
            database: var("SURREAL_DB").unwrap_or(db_defaults.database),
            username: var("SURREAL_USER").or(db_defaults.username),
            password: var("SURREAL_PASS").or(db_defaults.password),
        };

        let mail = match (var("MAIL_API_URL"), var("MAIL_API_KEY")) {
            (Some(endpoint), Some(api_key)) => Some(MailApiConfig {
                endpoint,
                api_key,
                from: var("MAIL_FROM").unwrap_or_else(|| "no-reply@miala.app".into()),
            }),
            (None, None) => None,
            _ => bail!("MAIL_API_URL and MAIL_API_KEY must be set together"),
        };

        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".into()),
            db,
            auth,
            mail,
            otp_sweep_period: parse_or(var("OTP_SWEEP_SECS"), "OTP_SWEEP_SECS", 0)
                .map(|secs| period_or(secs, OTP_SWEEP_PERIOD))?,
            signup_sweep_period: parse_or(var("SIGNUP_SWEEP_SECS"), "SIGNUP_SWEEP_SECS", 0)
                .map(|secs| period_or(secs, SIGNUP_SWEEP_PERIOD))?,
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

fn period_or(secs: u64, default: Duration) -> Duration {
    if secs == 0 {
        default
    } else {
        Duration::from_secs(secs)
    }
}
