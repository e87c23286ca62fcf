//! HTTP routes for the marketplace API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness
//! GET  /health/ready                - Store reachable
//! GET  /uploads/{public_id}         - Listing photos
//!
//! # Auth (rate limited)
//! POST /api/auth/register           - Create account, set cookie
//! POST /api/auth/login              - Sign in, set cookie
//! GET|POST /api/auth/logout         - Clear cookie
//! GET  /api/auth/profile            - Current account
//!
//! # Users
//! GET|PUT|DELETE /api/users/profile - Own profile
//!
//! # Cars
//! GET  /api/cars                    - All listings
//! POST /api/cars                    - Create listing (multipart)
//! GET  /api/cars/my                 - Own listings
//! POST /api/cars/search-by-image    - Find similar listings (multipart)
//! GET  /api/cars/{id}               - One listing
//! GET  /api/cars/{id}/contact       - Seller contact details
//!
//! # Test drives
//! POST /api/testdrives              - Book a slot
//! GET  /api/testdrives/my           - Own bookings
//! PUT  /api/testdrives/{id}         - Change status
//!
//! # Admin
//! GET  /api/admin/analytics
//! GET  /api/admin/cars
//! GET  /api/admin/users
//! GET  /api/admin/testdrives
//! ```

pub mod admin;
pub mod auth;
pub mod cars;
pub mod test_drives;
pub mod users;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request, State},
    http::{
        Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::from_fn,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::error::AppError;
use crate::middleware::{auth_rate_limiter, request_id_middleware, security_headers_middleware};
use crate::services::images::{MAX_IMAGE_BYTES, UPLOADS_PATH};
use crate::services::listings::MAX_IMAGES;
use crate::state::AppState;

/// Largest multipart body accepted on listing routes.
const CARS_BODY_LIMIT: usize = MAX_IMAGES * MAX_IMAGE_BYTES + 1024 * 1024;

/// Create the auth routes router.
pub fn auth_routes(rate_limited: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout).post(auth::logout))
        .route("/profile", get(auth::profile));

    if rate_limited {
        router.layer(auth_rate_limiter())
    } else {
        router
    }
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new().route(
        "/profile",
        get(users::show).put(users::update).delete(users::delete),
    )
}

/// Create the car routes router.
pub fn car_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cars::index).post(cars::create))
        .route("/my", get(cars::mine))
        .route("/search-by-image", post(cars::search_by_image))
        .route("/{id}", get(cars::show))
        .route("/{id}/contact", get(cars::contact))
        .layer(DefaultBodyLimit::max(CARS_BODY_LIMIT))
}

/// Create the test-drive routes router.
pub fn test_drive_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(test_drives::create))
        .route("/my", get(test_drives::mine))
        .route("/{id}", put(test_drives::update_status))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/analytics", get(admin::analytics))
        .route("/cars", get(admin::cars))
        .route("/users", get(admin::users))
        .route("/testdrives", get(admin::test_drives))
}

/// Create all `/api` routes.
pub fn api_routes(rate_limited: bool) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(rate_limited))
        .nest("/users", user_routes())
        .nest("/cars", car_routes())
        .nest("/testdrives", test_drive_routes())
        .nest("/admin", admin_routes())
}

/// Build the complete application with its middleware stack.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(state.config().cors_origin.clone())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
            user_id = tracing::field::Empty,
        )
    });

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes(state.config().rate_limit))
        .nest_service(UPLOADS_PATH, ServeDir::new(state.images().dir()))
        .fallback(not_found)
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
        .layer(from_fn(request_id_middleware))
        .layer(trace)
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}
