//! Admin dashboard data. Every handler requires the `admin` role.

use axum::extract::State;

use crate::error::{ApiJson, Result};
use crate::middleware::RequireAdmin;
use crate::models::{CarView, TestDriveView, UserProfile, UserSummary};
use crate::services::admin::{AdminService, Analytics};
use crate::state::AppState;

type AdminBooking = TestDriveView<UserSummary>;

/// GET /api/admin/analytics
///
/// # Errors
///
/// 401 for non-admins.
pub async fn analytics(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<ApiJson<Analytics<AdminBooking>>> {
    let analytics = AdminService::new(state.store()).analytics().await?;
    Ok(ApiJson(analytics.map_recent(|b| b.into_admin_view())))
}

/// GET /api/admin/cars
///
/// # Errors
///
/// 401 for non-admins.
pub async fn cars(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<ApiJson<Vec<CarView<UserSummary>>>> {
    let cars = AdminService::new(state.store()).cars().await?;
    Ok(ApiJson(cars.into_iter().map(|c| c.into_admin_view()).collect()))
}

/// GET /api/admin/users
///
/// # Errors
///
/// 401 for non-admins.
pub async fn users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<ApiJson<Vec<UserProfile>>> {
    let users = AdminService::new(state.store()).users().await?;
    Ok(ApiJson(users.iter().map(UserProfile::from).collect()))
}

/// GET /api/admin/testdrives
///
/// # Errors
///
/// 401 for non-admins.
pub async fn test_drives(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<ApiJson<Vec<AdminBooking>>> {
    let bookings = AdminService::new(state.store()).test_drives().await?;
    Ok(ApiJson(
        bookings.into_iter().map(|b| b.into_admin_view()).collect(),
    ))
}
