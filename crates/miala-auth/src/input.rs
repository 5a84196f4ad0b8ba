//! Request payloads and their validation rules.

use std::borrow::Cow;

use miala_core::error::MialaError;
use serde::Deserialize;
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

const SIGNUP_SPECIALS: &str = "@$!%*?&";
const SIGNIN_SPECIALS: &str = "@$!%*?&#";

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(custom(function = "validate_email"))]
    pub email: String,
    #[validate(custom(function = "validate_signup_password"))]
    pub password: String,
    #[validate(custom(function = "validate_firstname"))]
    pub firstname: String,
    #[validate(custom(function = "validate_lastname"))]
    pub lastname: String,
    #[validate(custom(function = "validate_phone_number"))]
    pub phone_number: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignInRequest {
    #[serde(alias = "userName", alias = "user_name", alias = "email", alias = "user")]
    #[validate(length(
        min = 5,
        max = 100,
        message = "Username/email must be between 5-100 characters"
    ))]
    pub username: String,
    #[serde(alias = "passWord", alias = "pwd", alias = "pass")]
    #[validate(custom(function = "validate_signin_password"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PhoneNumberRequest {
    #[validate(custom(function = "validate_phone_number"))]
    pub number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyOtpRequest {
    pub otp: String,
}

/// Run the derived rules and fold every message into one
/// `Validation` error, ordered by field name.
pub fn validate<T: Validate>(input: &T) -> Result<(), MialaError> {
    input.validate().map_err(|errors| MialaError::Validation {
        message: join_messages(&errors),
    })
}

fn join_messages(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn validate_username(value: &str) -> Result<(), ValidationError> {
    let ok = (5..=20).contains(&value.len())
        && value.chars().all(|c| c.is_ascii_alphanumeric())
        && value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(invalid(
            "username",
            "username must be 5-20 characters and Requires at least 1 lowercase, 1 uppercase, and 1 number",
        ))
    }
}

fn validate_email(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("required", "email is required"));
    }
    if !value.validate_email() {
        return Err(invalid("email", "email is in invalid format"));
    }
    Ok(())
}

fn has_password_classes(value: &str, specials: &str) -> bool {
    value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_digit())
        && value.chars().any(|c| specials.contains(c))
}

fn validate_signup_password(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(invalid("required", "password is required"));
    }
    let ok = (8..=20).contains(&value.chars().count())
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || SIGNUP_SPECIALS.contains(c))
        && has_password_classes(value, SIGNUP_SPECIALS);
    if ok {
        Ok(())
    } else {
        Err(invalid(
            "password",
            "password must be 8-20 chars with 1 uppercase, 1 lowercase, 1 number, and 1 special character (@$!%*?&)",
        ))
    }
}

fn validate_signin_password(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("required", "Password is required"));
    }
    if (8..=20).contains(&value.chars().count()) && has_password_classes(value, SIGNIN_SPECIALS) {
        Ok(())
    } else {
        Err(invalid(
            "password",
            "Password must be 8-20 characters with at least 1 uppercase, 1 lowercase, 1 number, and 1 special character (@$!%*?&#)",
        ))
    }
}

/// A letter, optionally followed by up to 48 letters, `'` or `-`, and
/// a closing letter.
fn is_valid_name(value: &str) -> bool {
    let chars: Vec<char> = value.chars().collect();
    match chars.as_slice() {
        [] => false,
        [only] => only.is_ascii_alphabetic(),
        [first, inner @ .., last] => {
            chars.len() <= 50
                && first.is_ascii_alphabetic()
                && last.is_ascii_alphabetic()
                && inner
                    .iter()
                    .all(|c| c.is_ascii_alphabetic() || *c == '\'' || *c == '-')
        }
    }
}

fn validate_firstname(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("required", "firstname is required"));
    }
    if is_valid_name(value) {
        Ok(())
    } else {
        Err(invalid(
            "firstname",
            "firstname must be 2-50 characters and can include letters, hyphens, or apostrophes",
        ))
    }
}

fn validate_lastname(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("required", "lastname is required"));
    }
    if is_valid_name(value) {
        Ok(())
    } else {
        Err(invalid(
            "lastname",
            "lastname must be 2-50 characters and can include letters, hyphens, or apostrophes",
        ))
    }
}

/// `0`, then `7`-`9`, then `0`/`1`, then eight digits.
pub fn is_valid_phone_number(value: &str) -> bool {
    let b = value.as_bytes();
    b.len() == 11
        && b[0] == b'0'
        && (b'7'..=b'9').contains(&b[1])
        && (b[2] == b'0' || b[2] == b'1')
        && b[3..].iter().all(u8::is_ascii_digit)
}

fn validate_phone_number(value: &str) -> Result<(), ValidationError> {
    if is_valid_phone_number(value) {
        Ok(())
    } else {
        Err(invalid(
            "phone_number",
            "Invalid Nigerian phone number (e.g., 08123456789)",
        ))
    }
}
