//! Authentication service: sign-in, token refresh, OTP-gated sign-up,
//! token validation and pending-signup cleanup.
//!
//! Registration moves an email through `no request -> pending signup ->
//! user`; a pending signup older than the retention window is dropped.

use std::collections::BTreeSet;

use chrono::{Duration, Utc};
use miala_core::error::{MialaError, MialaResult};
use miala_core::models::phone_number::CreatePhoneNumber;
use miala_core::models::signup::PendingSignup;
use miala_core::models::user::{CreateUser, UpdateUser, User};
use miala_core::network::detect_network;
use miala_core::repository::{
    OtpRepository, PermissionRepository, RoleRepository, SignupRepository, UserRepository,
};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::email::EmailSender;
use crate::error::AuthError;
use crate::input::{self, SignInRequest, SignUpRequest};
use crate::otp::OtpService;
use crate::password;
use crate::token::{Authorities, TokenEngine, mask_token};

pub const SIGNUP_MESSAGE: &str =
    "OTP sent successfully. Please verify your email to complete registration.";

/// Successful sign-in or refresh.
#[derive(Debug)]
pub struct SignInOutput {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Outcome class of a token validation.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Ok,
    BadRequest,
    Unauthorized,
    InternalServerError,
}

impl ValidationStatus {
    pub fn http_code(&self) -> u16 {
        match self {
            ValidationStatus::Ok => 200,
            ValidationStatus::BadRequest => 400,
            ValidationStatus::Unauthorized => 401,
            ValidationStatus::InternalServerError => 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TokenValidation {
    pub username: Option<String>,
    pub message: String,
    pub status: ValidationStatus,
}

impl TokenValidation {
    fn new(username: Option<String>, message: impl Into<String>, status: ValidationStatus) -> Self {
        Self {
            username,
            message: message.into(),
            status,
        }
    }
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct AuthService<U, R, P, S, O, E>
where
    U: UserRepository,
    R: RoleRepository,
    P: PermissionRepository,
    S: SignupRepository,
    O: OtpRepository,
    E: EmailSender,
{
    users: U,
    roles: R,
    permissions: P,
    signups: S,
    otp: OtpService<O, E>,
    tokens: TokenEngine,
    config: AuthConfig,
}

impl<U, R, P, S, O, E> AuthService<U, R, P, S, O, E>
where
    U: UserRepository,
    R: RoleRepository,
    P: PermissionRepository,
    S: SignupRepository,
    O: OtpRepository,
    E: EmailSender,
{
    pub fn new(
        users: U,
        roles: R,
        permissions: P,
        signups: S,
        otp: OtpService<O, E>,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            roles,
            permissions,
            signups,
            otp,
            tokens: TokenEngine::new(&config),
            config,
        }
    }

    pub fn tokens(&self) -> &TokenEngine {
        &self.tokens
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Authenticate with username or email plus password and issue a
    /// token pair.
    pub async fn sign_in(&self, request: SignInRequest) -> MialaResult<SignInOutput> {
        input::validate(&request)?;

        // 1. Look up the user by username or email, exact match.
        let user = match self.users.get_by_username_or_email(&request.username).await {
            Ok(user) => user,
            Err(MialaError::NotFound { .. }) => {
                warn!(identifier = %request.username, "Sign-in failed: unknown user");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        // 2. Verify password.
        let valid = password::verify_password(
            &request.password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            warn!(username = %user.username, "Sign-in failed: wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        // 3. Issue tokens.
        let (access_token, refresh_token) = self.issue_pair(&user).await?;

        // 4. Record the login.
        let user = self
            .users
            .update(
                user.id,
                UpdateUser {
                    last_login_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        info!(username = %user.username, "User signed in");
        Ok(SignInOutput {
            access_token,
            refresh_token,
            user,
        })
    }

    /// Exchange a valid refresh token for a new token pair.
    pub async fn refresh_token(&self, token: &str) -> MialaResult<SignInOutput> {
        if token.trim().is_empty() {
            return Err(AuthError::Unauthenticated("Refresh token is missing".into()).into());
        }

        let claims = self.tokens.decode(token)?;
        let username = claims
            .sub
            .clone()
            .filter(|sub| !sub.trim().is_empty())
            .ok_or(AuthError::MissingSubject)?;
        if !claims.is_not_expired_at(Utc::now()) {
            warn!(%username, token = %mask_token(token), "Refresh rejected: token expired");
            return Err(AuthError::TokenExpired.into());
        }

        let user = self.users.get_by_username(&username).await?;
        let (access_token, refresh_token) = self.issue_pair(&user).await?;

        info!(%username, "Token pair refreshed");
        Ok(SignInOutput {
            access_token,
            refresh_token,
            user,
        })
    }

    /// Stage a registration and send its OTP. No user exists until the
    /// OTP is verified.
    pub async fn sign_up(&self, request: SignUpRequest) -> MialaResult<String> {
        input::validate(&request)?;
        detect_network(&request.phone_number)?;

        if self
            .users
            .exists_by_username_or_email(&request.username, &request.email)
            .await?
        {
            return Err(MialaError::AlreadyExists {
                message: "Username or email already exists".into(),
            });
        }

        let password_hash =
            password::hash_password(&request.password, self.config.pepper.as_deref())?;
        let email = request.email.clone();
        self.signups
            .save(PendingSignup {
                email: request.email,
                username: request.username,
                firstname: request.firstname,
                lastname: request.lastname,
                phone_number: request.phone_number,
                password_hash,
                created_at: Utc::now(),
            })
            .await?;

        self.otp.issue(&email).await?;

        info!(%email, "Pending signup stored");
        Ok(SIGNUP_MESSAGE.into())
    }

    /// Verify an OTP and turn the matching pending signup into a user.
    pub async fn verify_otp(&self, code: &str) -> MialaResult<User> {
        // 1. Find the live code. It is consumed in step 4.
        let otp = self.otp.check(code).await?;
        let email = otp.email.clone();

        // 2. Load the staged registration.
        let signup = self
            .signups
            .find_by_email(&email)
            .await?
            .ok_or_else(|| MialaError::not_found("signup_request", email.clone()))?;

        // 3. Resolve phone network and default roles.
        let network = detect_network(&signup.phone_number)?;
        let role_ids: BTreeSet<Uuid> = self
            .roles
            .list_default()
            .await?
            .into_iter()
            .map(|role| role.id)
            .collect();

        // 4. Consume the code, create the user and drop the pending
        //    signup atomically.
        let user = self
            .users
            .create_from_signup(
                CreateUser {
                    username: signup.username,
                    email: signup.email,
                    password_hash: signup.password_hash,
                    firstname: signup.firstname,
                    lastname: signup.lastname,
                    role_ids,
                    phone_numbers: vec![CreatePhoneNumber {
                        number: signup.phone_number,
                        network,
                    }],
                },
                &email,
                otp.id,
            )
            .await?;

        // 5. Confirm only after the transaction committed.
        self.otp.confirm(&otp);

        info!(username = %user.username, "Registration completed");
        Ok(user)
    }

    /// Classify a bearer token. Never fails: store or crypto failures
    /// are reported as [`ValidationStatus::InternalServerError`].
    pub async fn validate_token(&self, token: &str) -> TokenValidation {
        if token.trim().is_empty() {
            return TokenValidation::new(
                None,
                "Token cannot be empty",
                ValidationStatus::BadRequest,
            );
        }

        let claims = match self.tokens.decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(token = %mask_token(token), error = %e, "Token validation failed");
                return TokenValidation::new(None, e.to_string(), ValidationStatus::Unauthorized);
            }
        };

        let Some(username) = claims.sub.clone().filter(|sub| !sub.trim().is_empty()) else {
            return TokenValidation::new(
                None,
                AuthError::MissingSubject.to_string(),
                ValidationStatus::Unauthorized,
            );
        };

        if !claims.is_not_expired_at(Utc::now()) {
            return TokenValidation::new(
                Some(username),
                AuthError::TokenExpired.to_string(),
                ValidationStatus::Unauthorized,
            );
        }

        match self.users.get_by_username(&username).await {
            Ok(_) => TokenValidation::new(Some(username), "Token is valid", ValidationStatus::Ok),
            Err(MialaError::NotFound { .. }) => TokenValidation::new(
                Some(username),
                "User not found",
                ValidationStatus::Unauthorized,
            ),
            Err(e) => {
                error!(%username, error = %e, "Token validation failed");
                TokenValidation::new(
                    Some(username),
                    "An unexpected error occurred",
                    ValidationStatus::InternalServerError,
                )
            }
        }
    }

    /// Resolve the user a bearer access token belongs to. Used by the
    /// HTTP layer to install the request principal.
    pub async fn authenticate(&self, token: &str) -> MialaResult<User> {
        let claims = self.tokens.decode(token)?;
        let username = claims
            .sub
            .clone()
            .filter(|sub| !sub.trim().is_empty())
            .ok_or(AuthError::MissingSubject)?;
        if !claims.is_not_expired_at(Utc::now()) {
            return Err(AuthError::TokenExpired.into());
        }

        match self.users.get_by_username(&username).await {
            Err(MialaError::NotFound { .. }) => Err(MialaError::AuthenticationFailed {
                reason: "User not found".into(),
            }),
            other => other,
        }
    }

    /// Delete pending signups older than the retention window.
    pub async fn cleanup_stale_signups(&self) -> MialaResult<u64> {
        let cutoff = Utc::now() - Duration::seconds(self.config.signup_retention_secs as i64);
        let deleted = self.signups.delete_created_before(cutoff).await?;

        if deleted > 0 {
            info!(deleted, "Removed stale pending signups");
        }
        Ok(deleted)
    }

    /// Delete expired OTP codes.
    pub async fn cleanup_expired_otps(&self) -> MialaResult<u64> {
        self.otp.cleanup_expired().await
    }

    async fn authorities(&self, user: &User) -> MialaResult<Authorities> {
        let role_ids: Vec<Uuid> = user.role_ids.iter().copied().collect();
        let roles = self.roles.get_by_ids(&role_ids).await?;

        let permission_ids: Vec<Uuid> = roles
            .iter()
            .flat_map(|role| role.permission_ids.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let permissions = self.permissions.get_by_ids(&permission_ids).await?;

        Ok(Authorities::resolve(&roles, &permissions))
    }

    async fn issue_pair(&self, user: &User) -> MialaResult<(String, String)> {
        let authorities = self.authorities(user).await?;
        let access_token = self.tokens.issue_access_token(user, &authorities)?;
        let refresh_token = self.tokens.issue_refresh_token(user)?;
        Ok((access_token, refresh_token))
    }
}
