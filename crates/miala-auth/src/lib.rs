//! Miala Auth: credential verification, JWT issuance/validation,
//! OTP-gated registration and phone-number management.

pub mod cache;
pub mod config;
pub mod context;
pub mod email;
pub mod error;
pub mod input;
pub mod otp;
pub mod password;
pub mod phone;
pub mod service;
pub mod sweeper;
pub mod token;

pub use cache::CachingRoleRepository;
pub use config::AuthConfig;
pub use error::AuthError;
pub use otp::OtpService;
pub use phone::PhoneNumberService;
pub use service::{AuthService, SignInOutput, TokenValidation, ValidationStatus};
pub use token::{Authorities, Claims, TokenEngine};
