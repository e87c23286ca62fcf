//! Self-service profile management.

use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::error::{ApiJson, Result, clear_sentry_user, message};
use crate::middleware::{RequireAuth, clear_token_cookie};
use crate::models::UserProfile;
use crate::services::auth::{AuthService, ProfileUpdate};
use crate::state::AppState;

/// Profile edit body. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

/// GET /api/users/profile
///
/// # Errors
///
/// 401 without a valid credential.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<ApiJson<UserProfile>> {
    let user = AuthService::new(state.store()).get_user(identity.id).await?;
    Ok(ApiJson(UserProfile::from(&user)))
}

/// PUT /api/users/profile
///
/// # Errors
///
/// 400 for invalid values, 409 if the new email is taken.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    ApiJson(body): ApiJson<UpdateProfileRequest>,
) -> Result<ApiJson<UserProfile>> {
    let user = AuthService::new(state.store())
        .update_profile(
            identity.id,
            ProfileUpdate {
                name: body.name,
                email: body.email,
                password: body.password,
                phone_number: body.phone_number,
                address: body.address,
            },
        )
        .await?;
    Ok(ApiJson(UserProfile::from(&user)))
}

/// DELETE /api/users/profile
///
/// Removes the account with its listings and bookings, then signs out.
///
/// # Errors
///
/// 401 without a valid credential.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Response> {
    AuthService::new(state.store())
        .delete_account(identity.id)
        .await?;
    clear_sentry_user();

    let cookie = clear_token_cookie(state.config().secure_cookies())?;
    Ok(([(SET_COOKIE, cookie)], message("User removed")).into_response())
}
