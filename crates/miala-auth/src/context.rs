//! Request-scoped authenticated principal.
//!
//! The HTTP middleware runs each authenticated request inside
//! [`scope`]; services read the caller back with
//! [`authenticated_principal`].

use miala_core::error::MialaResult;
use miala_core::models::user::User;

use crate::error::AuthError;

tokio::task_local! {
    static PRINCIPAL: User;
}

/// Run `fut` with `user` installed as the authenticated principal.
pub async fn scope<F: Future>(user: User, fut: F) -> F::Output {
    PRINCIPAL.scope(user, fut).await
}

/// The user the current request is authenticated as.
pub fn authenticated_principal() -> MialaResult<User> {
    PRINCIPAL
        .try_with(User::clone)
        .map_err(|_| AuthError::Unauthenticated("No authenticated user".into()).into())
}
