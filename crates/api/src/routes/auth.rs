//! Registration, login and logout.

use axum::{
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::error::{ApiJson, Result, add_breadcrumb, clear_sentry_user, message, set_sentry_user};
use crate::middleware::{RequireAuth, clear_token_cookie, token_cookie};
use crate::models::{User, UserProfile};
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

/// Registration body. The role is never accepted from clients.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

/// Login body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /api/auth/register
///
/// # Errors
///
/// 400 for invalid input, 409 if the email is taken.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<Response> {
    let user = AuthService::new(state.store())
        .register(Registration {
            name: body.name,
            email: body.email,
            password: body.password,
            phone_number: body.phone_number,
            address: body.address,
        })
        .await?;

    add_breadcrumb("auth", "Registered", None);
    signed_in(&state, &user, StatusCode::CREATED)
}

/// POST /api/auth/login
///
/// # Errors
///
/// 400 if a field is missing, 401 for wrong credentials.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Response> {
    let user = AuthService::new(state.store())
        .login(body.email, body.password)
        .await?;

    tracing::info!(user_id = %user.id, "User logged in");
    signed_in(&state, &user, StatusCode::OK)
}

/// GET|POST /api/auth/logout
///
/// # Errors
///
/// Only if the clearing cookie cannot be built.
pub async fn logout(State(state): State<AppState>) -> Result<Response> {
    clear_sentry_user();
    let cookie = clear_token_cookie(state.config().secure_cookies())?;
    Ok(([(SET_COOKIE, cookie)], message("Logged out successfully")).into_response())
}

/// GET /api/auth/profile
///
/// # Errors
///
/// 401 without a valid credential.
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<ApiJson<UserProfile>> {
    let user = AuthService::new(state.store()).get_user(identity.id).await?;
    Ok(ApiJson(UserProfile::from(&user)))
}

/// Issue a token cookie and respond with the profile.
fn signed_in(state: &AppState, user: &User, status: StatusCode) -> Result<Response> {
    let token = state.tokens().issue(user.id)?;
    let cookie = token_cookie(&token, state.config().secure_cookies())?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok((status, [(SET_COOKIE, cookie)], ApiJson(UserProfile::from(user))).into_response())
}
