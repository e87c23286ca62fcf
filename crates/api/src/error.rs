//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Every error body has the shape `{"message": "..."}`.

use axum::{
    Json,
    extract::{
        FromRequest,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::ai::AiError;
use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::booking::BookingError;
use crate::services::images::ImageStoreError;
use crate::services::listings::ListingError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Booking operation failed.
    #[error("Booking error: {0}")]
    Booking(#[from] BookingError),

    /// Listing operation failed.
    #[error("Listing error: {0}")]
    Listing(#[from] ListingError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl AppError {
    /// Whether this error is the server's fault and should be reported.
    fn is_server_error(&self) -> bool {
        match self {
            Self::Database(_) | Self::Internal(_) => true,
            Self::Auth(err) => matches!(
                err,
                AuthError::Repository(_) | AuthError::PasswordHash | AuthError::Token(_)
            ),
            Self::Booking(err) => matches!(err, BookingError::Repository(_)),
            Self::Listing(err) => matches!(
                err,
                ListingError::Repository(_)
                    | ListingError::Ai(_)
                    | ListingError::Image(ImageStoreError::Io(_))
            ),
            _ => false,
        }
    }

    /// HTTP status and client-facing message.
    ///
    /// Internal details never reach the client.
    fn status_and_message(&self) -> (StatusCode, String) {
        const INTERNAL: &str = "Internal server error";

        match self {
            Self::Database(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
            }
            Self::Auth(err) => auth_response(err),
            Self::Booking(err) => booking_response(err),
            Self::Listing(err) => listing_response(err),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, please try again later".to_string(),
            ),
        }
    }
}

fn auth_response(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::InvalidEmail(_) => (StatusCode::BAD_REQUEST, "Invalid email address".to_string()),
        AuthError::MissingField(field) => (
            StatusCode::BAD_REQUEST,
            format!("Please provide a {field}"),
        ),
        AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "Invalid email or password".to_string(),
        ),
        AuthError::UserAlreadyExists => (StatusCode::CONFLICT, "User already exists".to_string()),
        AuthError::MissingToken => (
            StatusCode::UNAUTHORIZED,
            "Not authorized, no token".to_string(),
        ),
        AuthError::InvalidToken => (
            StatusCode::UNAUTHORIZED,
            "Not authorized, token failed".to_string(),
        ),
        AuthError::UserNotFound => (
            StatusCode::UNAUTHORIZED,
            "Not authorized, user not found".to_string(),
        ),
        AuthError::NotAdmin => (
            StatusCode::UNAUTHORIZED,
            "Not authorized as an admin".to_string(),
        ),
        AuthError::Token(_) | AuthError::Repository(_) | AuthError::PasswordHash => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
    }
}

fn booking_response(err: &BookingError) -> (StatusCode, String) {
    match err {
        BookingError::MissingField(_) => (
            StatusCode::BAD_REQUEST,
            "Please provide all required fields: car ID, date, time slot, and contact number"
                .to_string(),
        ),
        BookingError::InvalidDate(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        BookingError::MessageTooLong => (StatusCode::BAD_REQUEST, capitalize(&err.to_string())),
        BookingError::CarNotFound => (StatusCode::NOT_FOUND, "Car not found".to_string()),
        BookingError::SlotTaken => (
            StatusCode::BAD_REQUEST,
            "This slot is already booked for this car".to_string(),
        ),
        BookingError::NotFound => (
            StatusCode::NOT_FOUND,
            "Test drive booking not found".to_string(),
        ),
        BookingError::InvalidStatus(_) => (
            StatusCode::BAD_REQUEST,
            "Please provide a valid status".to_string(),
        ),
        BookingError::NotPermitted => (
            StatusCode::UNAUTHORIZED,
            "Not authorized to update this booking".to_string(),
        ),
        BookingError::InvalidTransition(e) => (StatusCode::CONFLICT, capitalize(&e.to_string())),
        BookingError::Repository(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
    }
}

fn listing_response(err: &ListingError) -> (StatusCode, String) {
    match err {
        ListingError::MissingField(field) => (
            StatusCode::BAD_REQUEST,
            format!("Please provide the car's {field}"),
        ),
        ListingError::InvalidField { .. } | ListingError::ImageCount => {
            (StatusCode::BAD_REQUEST, capitalize(&err.to_string()))
        }
        ListingError::Image(ImageStoreError::Io(_)) | ListingError::Repository(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
        ListingError::Image(e) => (StatusCode::BAD_REQUEST, capitalize(&e.to_string())),
        ListingError::NotFound => (StatusCode::NOT_FOUND, "Car not found".to_string()),
        ListingError::NoSimilarCars => (
            StatusCode::NOT_FOUND,
            "No similar cars found. Please try a different image or search manually.".to_string(),
        ),
        ListingError::AssistantUnavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Image search is not available".to_string(),
        ),
        ListingError::Ai(AiError::RateLimited(_)) => (
            StatusCode::BAD_GATEWAY,
            "Image analysis is busy, please try again shortly".to_string(),
        ),
        ListingError::Ai(_) => (
            StatusCode::BAD_GATEWAY,
            "Error analyzing image".to_string(),
        ),
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let (status, message) = self.status_and_message();
        (status, Json(ErrorBody { message })).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(err.body_text())
    }
}

impl From<ImageStoreError> for AppError {
    fn from(err: ImageStoreError) -> Self {
        Self::Listing(ListingError::Image(err))
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// JSON extractor and response whose rejections use the `{message}` body.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl<T: Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

/// A `{message}` body for successful responses that carry no data.
#[must_use]
pub fn message(text: &str) -> ApiJson<ErrorBody> {
    ApiJson(ErrorBody {
        message: text.to_string(),
    })
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("booking", "Requested test drive", Some(&[("car_id", "12")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use carmart_core::{TestDriveStatus, TransitionError};

    use super::*;

    fn status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    async fn body(err: impl Into<AppError>) -> serde_json::Value {
        let response = err.into().into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("car 123".to_string());
        assert_eq!(err.to_string(), "Not found: car 123");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status(BookingError::SlotTaken), StatusCode::BAD_REQUEST);
        assert_eq!(status(BookingError::CarNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(BookingError::NotPermitted), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(BookingError::InvalidTransition(TransitionError {
                from: TestDriveStatus::Completed,
                to: TestDriveStatus::Confirmed,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(status(AuthError::UserAlreadyExists), StatusCode::CONFLICT);
        assert_eq!(status(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status(ListingError::AssistantUnavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status(ListingError::Ai(AiError::EmptyResponse)), StatusCode::BAD_GATEWAY);
        assert_eq!(status(ListingError::NoSimilarCars), StatusCode::NOT_FOUND);
        assert_eq!(status(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_body_is_json_message() {
        let json = body(BookingError::SlotTaken).await;
        assert_eq!(json["message"], "This slot is already booked for this car");

        let json = body(BookingError::InvalidTransition(TransitionError {
            from: TestDriveStatus::Canceled,
            to: TestDriveStatus::Confirmed,
        }))
        .await;
        assert_eq!(json["message"], "Cannot change status from canceled to confirmed");
    }

    #[tokio::test]
    async fn test_internal_details_are_masked() {
        let json = body(AppError::Internal("pool exhausted at 10.0.0.3".to_string())).await;
        assert_eq!(json["message"], "Internal server error");

        let json = body(RepositoryError::DataCorruption("bad role".to_string())).await;
        assert_eq!(json["message"], "Internal server error");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("cannot go"), "Cannot go");
        assert_eq!(capitalize(""), "");
    }
}
