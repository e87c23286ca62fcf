//! Test-drive booking routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use carmart_core::UserId;

use crate::error::{ApiJson, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{TestDrive, TestDriveView};
use crate::services::booking::{BookingRequest, BookingService};
use crate::state::AppState;

/// A car reference sent either as a JSON number or a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CarRef {
    Number(i64),
    Text(String),
}

impl From<CarRef> for String {
    fn from(car: CarRef) -> Self {
        match car {
            CarRef::Number(n) => n.to_string(),
            CarRef::Text(s) => s,
        }
    }
}

/// Booking request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestDriveRequest {
    pub car: Option<CarRef>,
    pub date: Option<String>,
    pub time_slot: Option<String>,
    pub contact_number: Option<String>,
    pub message: Option<String>,
}

/// Status change body.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

/// POST /api/testdrives
///
/// # Errors
///
/// 400 for missing fields or a taken slot, 401 without a credential, 404
/// for an unknown car.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    ApiJson(body): ApiJson<CreateTestDriveRequest>,
) -> Result<(StatusCode, ApiJson<TestDrive>)> {
    let booking = BookingService::new(state.store())
        .request_booking(
            &identity,
            BookingRequest {
                car: body.car.map(String::from),
                date: body.date,
                time_slot: body.time_slot,
                contact_number: body.contact_number,
                message: body.message,
            },
        )
        .await?;

    add_breadcrumb(
        "booking",
        "Booked test drive",
        Some(&[("car_id", booking.car.to_string().as_str())]),
    );
    Ok((StatusCode::CREATED, ApiJson(booking)))
}

/// GET /api/testdrives/my
///
/// # Errors
///
/// 401 without a valid credential.
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<ApiJson<Vec<TestDriveView<UserId>>>> {
    let bookings = BookingService::new(state.store())
        .bookings_for(&identity)
        .await?;
    Ok(ApiJson(
        bookings.into_iter().map(|b| b.into_owner_view()).collect(),
    ))
}

/// PUT /api/testdrives/{id}
///
/// # Errors
///
/// 400 for an invalid status, 401 unless the caller booked it or is an
/// admin, 404 for an unknown booking, 409 for a disallowed transition.
pub async fn update_status(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateStatusRequest>,
) -> Result<ApiJson<TestDrive>> {
    let booking = BookingService::new(state.store())
        .update_status(&identity, &id, body.status.as_deref())
        .await?;
    Ok(ApiJson(booking))
}
