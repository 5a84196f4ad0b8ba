//! Authentication error types.

use miala_core::error::MialaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username/email or password")]
    InvalidCredentials,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid JWT token: {0}")]
    TokenInvalid(String),

    #[error("Invalid token: No username found")]
    MissingSubject,

    #[error("{0}")]
    Unauthenticated(String),

    #[error("Invalid OTP")]
    OtpInvalid { code: String },

    #[error("OTP has expired")]
    OtpExpired,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for MialaError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenInvalid(_)
            | AuthError::MissingSubject => MialaError::AuthenticationFailed {
                reason: err.to_string(),
            },
            AuthError::Unauthenticated(reason) => MialaError::Unauthorized { reason },
            AuthError::OtpInvalid { code } => MialaError::not_found("OTP", code),
            AuthError::OtpExpired => MialaError::Expired {
                message: err.to_string(),
            },
            AuthError::Crypto(msg) => MialaError::Crypto(msg),
        }
    }
}
