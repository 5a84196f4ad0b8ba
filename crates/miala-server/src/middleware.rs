//! Bearer-token authentication for protected routes.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use miala_auth::context;
use miala_auth::email::EmailSender;
use miala_core::error::MialaError;
use tracing::warn;

use crate::response::ApiError;
use crate::state::AppState;

/// Token from an `Authorization: Bearer <token>` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the bearer token to a user and run the rest of the request
/// with that user as the authenticated principal.
pub async fn require_principal<E: EmailSender>(
    State(state): State<AppState<E>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(req.headers()) else {
        warn!(method = %req.method(), uri = %req.uri(), "Missing bearer token");
        return Err(MialaError::Unauthorized {
            reason: "Missing bearer token".into(),
        }
        .into());
    };

    let user = state.auth.authenticate(token).await?;
    Ok(context::scope(user, next.run(req)).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn extracts_bearer_tokens_only() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }
}
