//! Authentication extractors and the credential cookie.
//!
//! The credential is a JWT carried in the `token` cookie, or in an
//! `Authorization: Bearer` header for non-browser clients. The account is
//! reloaded on every request, so deletions and role changes apply
//! immediately.

use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap, HeaderValue,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};
use cookie::{Cookie, SameSite, time::Duration};

use crate::error::{AppError, set_sentry_user};
use crate::models::Identity;
use crate::services::auth::{AuthError, AuthService, TOKEN_TTL};
use crate::state::AppState;

/// Name of the credential cookie.
pub const TOKEN_COOKIE: &str = "token";

/// Extractor that requires a signed-in account.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAuth(identity): RequireAuth) -> String {
///     format!("Hello, {}!", identity.name)
/// }
/// ```
pub struct RequireAuth(pub Identity);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers).ok_or(AuthError::MissingToken)?;
        Ok(Self(authenticate(state, &token).await?))
    }
}

/// Extractor that requires a signed-in admin.
///
/// Non-admins get the same 401 as anonymous callers.
pub struct RequireAdmin(pub Identity);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(identity) = RequireAuth::from_request_parts(parts, state).await?;
        if !identity.is_admin() {
            tracing::warn!(user_id = %identity.id, "Admin route refused");
            return Err(AuthError::NotAdmin.into());
        }
        Ok(Self(identity))
    }
}

/// Extractor that resolves the account if a valid credential is present.
///
/// Missing, expired and invalid credentials all yield `None`.
pub struct OptionalAuth(pub Option<Identity>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = token_from_headers(&parts.headers) else {
            return Ok(Self(None));
        };
        match authenticate(state, &token).await {
            Ok(identity) => Ok(Self(Some(identity))),
            Err(AppError::Auth(AuthError::Repository(e))) => Err(AuthError::Repository(e).into()),
            Err(_) => Ok(Self(None)),
        }
    }
}

async fn authenticate(state: &AppState, token: &str) -> Result<Identity, AppError> {
    let user_id = state.tokens().verify(token)?;
    let identity = AuthService::new(state.store()).identity(user_id).await?;

    tracing::Span::current().record("user_id", identity.id.as_i32());
    set_sentry_user(&identity.id, Some(identity.email.as_str()));
    Ok(identity)
}

/// The credential from the `token` cookie, else from a Bearer header.
fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == TOKEN_COOKIE && !c.value().is_empty())
        .map(|c| c.value().to_owned());

    from_cookie.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
    })
}

/// `Set-Cookie` value carrying a freshly issued token.
///
/// # Errors
///
/// Returns `AppError::Internal` if the token contains bytes that are not
/// valid in a header.
pub fn token_cookie(token: &str, secure: bool) -> Result<HeaderValue, AppError> {
    let cookie = Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .max_age(Duration::seconds(TOKEN_TTL.num_seconds()))
        .build();
    header_value(&cookie)
}

/// `Set-Cookie` value that clears the credential.
///
/// # Errors
///
/// Returns `AppError::Internal` if the header cannot be built.
pub fn clear_token_cookie(secure: bool) -> Result<HeaderValue, AppError> {
    let mut cookie = Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .build();
    cookie.make_removal();
    header_value(&cookie)
}

fn header_value(cookie: &Cookie<'_>) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| AppError::Internal(format!("invalid cookie header: {e}")))
}
