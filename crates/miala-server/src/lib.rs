//! Miala Server: axum adapter over the identity services.

pub mod config;
pub mod cookies;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use response::{ApiError, ApiResponse};
pub use routes::router;
pub use state::{AppState, Mailer};
