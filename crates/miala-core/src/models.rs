//! Domain models for Miala.
//!
//! These are the core types shared across all crates.

pub mod otp;
pub mod permission;
pub mod phone_number;
pub mod role;
pub mod signup;
pub mod user;
