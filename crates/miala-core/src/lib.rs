//! Miala Core: domain models, repository traits, and shared error
//! types for the identity service.

pub mod error;
pub mod models;
pub mod network;
pub mod repository;
