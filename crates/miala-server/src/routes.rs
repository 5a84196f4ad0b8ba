//! HTTP routes.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router, middleware};
use axum_extra::extract::cookie::CookieJar;
use miala_auth::email::EmailSender;
use miala_auth::input::{PhoneNumberRequest, SignInRequest, SignUpRequest, VerifyOtpRequest};
use miala_auth::{SignInOutput, TokenValidation};
use miala_core::models::user::{PhoneNumberView, UserView};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::cookies::{refresh_cookie, refresh_token_from};
use crate::middleware::{bearer_token, require_principal};
use crate::response::{ApiError, ApiResponse};
use crate::state::AppState;

type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub access_token: String,
    pub user: UserView,
}

pub fn router<E: EmailSender>(state: AppState<E>) -> Router {
    let auth_routes = Router::new()
        .route("/signin", post(sign_in::<E>))
        .route("/refresh-token", post(refresh_token::<E>))
        .route("/signup", post(sign_up::<E>))
        .route("/verify-otp", post(verify_otp::<E>))
        .route("/validate-token", get(validate_token::<E>));

    let phone_routes = Router::new()
        .route(
            "/{user_id}/phone-numbers",
            get(list_phone_numbers::<E>).post(add_phone_number::<E>),
        )
        .route(
            "/{user_id}/phone-numbers/{phone_id}",
            delete(remove_phone_number::<E>),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_principal::<E>,
        ));

    Router::new()
        .route("/ping", get(ping))
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/users", phone_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn ping() -> &'static str {
    "pong"
}

/// Set the rotated refresh cookie and return the access token with
/// the user.
fn token_response<E: EmailSender>(
    state: &AppState<E>,
    jar: CookieJar,
    output: SignInOutput,
) -> (CookieJar, ApiResponse<AuthPayload>) {
    let config = state.auth.config();
    let jar = jar.add(refresh_cookie(
        output.refresh_token,
        config.refresh_token_lifetime_secs,
    ));
    let payload = AuthPayload {
        access_token: output.access_token,
        user: output.user.view(config.display_offset()),
    };
    (jar, ApiResponse::success(StatusCode::OK, payload))
}

async fn sign_in<E: EmailSender>(
    State(state): State<AppState<E>>,
    jar: CookieJar,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<(CookieJar, ApiResponse<AuthPayload>), ApiError> {
    let Json(request) = payload?;
    info!(identifier = %request.username, "Sign-in request received");

    let output = state.auth.sign_in(request).await?;
    Ok(token_response(&state, jar, output))
}

async fn refresh_token<E: EmailSender>(
    State(state): State<AppState<E>>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<AuthPayload>), ApiError> {
    let token = refresh_token_from(&jar);
    let output = state.auth.refresh_token(&token).await?;
    Ok(token_response(&state, jar, output))
}

async fn sign_up<E: EmailSender>(
    State(state): State<AppState<E>>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> ApiResult<String> {
    let Json(request) = payload?;
    info!(email = %request.email, "Signup request received");

    let message = state.auth.sign_up(request).await?;
    Ok(ApiResponse::success(StatusCode::OK, message))
}

async fn verify_otp<E: EmailSender>(
    State(state): State<AppState<E>>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> ApiResult<UserView> {
    let Json(request) = payload?;

    let user = state.auth.verify_otp(&request.otp).await?;
    let offset = state.auth.config().display_offset();
    Ok(ApiResponse::success(StatusCode::CREATED, user.view(offset)))
}

async fn validate_token<E: EmailSender>(
    State(state): State<AppState<E>>,
    headers: HeaderMap,
) -> ApiResponse<TokenValidation> {
    let token = bearer_token(&headers).unwrap_or_default();
    let validation = state.auth.validate_token(token).await;

    let status = StatusCode::from_u16(validation.status.http_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    ApiResponse::success(status, validation)
}

async fn list_phone_numbers<E: EmailSender>(
    State(state): State<AppState<E>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Vec<PhoneNumberView>> {
    let Path(user_id) = path?;
    let phones = state.phones.list_phone_numbers(user_id).await?;
    let views = phones.iter().map(|phone| phone.view()).collect();
    Ok(ApiResponse::success(StatusCode::OK, views))
}

async fn add_phone_number<E: EmailSender>(
    State(state): State<AppState<E>>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<PhoneNumberRequest>, JsonRejection>,
) -> ApiResult<PhoneNumberView> {
    let Path(user_id) = path?;
    let Json(request) = payload?;

    let phone = state.phones.add_phone_number(user_id, request).await?;
    Ok(ApiResponse::success(StatusCode::CREATED, phone.view()))
}

async fn remove_phone_number<E: EmailSender>(
    State(state): State<AppState<E>>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> ApiResult<()> {
    let Path((user_id, phone_id)) = path?;
    state.phones.remove_phone_number(user_id, phone_id).await?;
    Ok(ApiResponse::with_status(StatusCode::OK, None))
}
