//! Test-drive booking engine.
//!
//! Buyers request a (car, day, time slot); at most one live booking may
//! hold a slot at a time. Bookings then move through the status machine in
//! [`TestDriveStatus`], driven by the requester or an admin.

use thiserror::Error;
use tracing::instrument;

use carmart_core::{
    BookingDateError, CarId, MAX_MESSAGE_LENGTH, StatusError, TestDriveId, TestDriveStatus,
    TimeSlot, TransitionError, parse_booking_date,
};

use crate::db::{RepositoryError, Store};
use crate::models::{Identity, NewTestDrive, TestDrive, TestDriveListing};

/// Errors from booking operations.
#[derive(Debug, Error)]
pub enum BookingError {
    /// A required field was absent or blank.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The date is not a calendar day.
    #[error(transparent)]
    InvalidDate(#[from] BookingDateError),

    /// The message is too long.
    #[error("message must be at most {MAX_MESSAGE_LENGTH} characters")]
    MessageTooLong,

    /// The referenced car does not exist.
    #[error("car not found")]
    CarNotFound,

    /// A live booking already holds the slot.
    #[error("time slot already booked")]
    SlotTaken,

    /// The booking does not exist.
    #[error("test drive not found")]
    NotFound,

    /// The requested status is not a valid update target.
    #[error(transparent)]
    InvalidStatus(#[from] StatusError),

    /// The actor is neither the requester nor an admin.
    #[error("not authorized to update this test drive")]
    NotPermitted,

    /// The transition is not an edge of the status machine.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Raw booking request as submitted by a buyer.
#[derive(Debug, Default, Clone)]
pub struct BookingRequest {
    pub car: Option<String>,
    pub date: Option<String>,
    pub time_slot: Option<String>,
    pub contact_number: Option<String>,
    pub message: Option<String>,
}

/// Booking engine.
pub struct BookingService<'a> {
    store: &'a dyn Store,
}

impl<'a> BookingService<'a> {
    /// Create a new booking service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Book a test drive for `requester`.
    ///
    /// # Errors
    ///
    /// - `MissingField`, `InvalidDate`, `MessageTooLong` for invalid input
    /// - `CarNotFound` if the car does not exist
    /// - `SlotTaken` if a live booking already holds the slot
    #[instrument(skip_all, fields(user_id = %requester.id))]
    pub async fn request_booking(
        &self,
        requester: &Identity,
        request: BookingRequest,
    ) -> Result<TestDrive, BookingError> {
        let car = required(request.car.as_deref(), "car")?;
        let date = required(request.date.as_deref(), "date")?;
        // Slots are compared byte-for-byte, so only blank labels are refused.
        let time_slot = request
            .time_slot
            .as_deref()
            .and_then(|s| TimeSlot::parse(s).ok())
            .ok_or(BookingError::MissingField("timeSlot"))?;
        let contact_number = required(request.contact_number.as_deref(), "contactNumber")?;

        let date = parse_booking_date(date)?;
        let message = request
            .message
            .map(|m| m.trim().to_owned())
            .filter(|m| !m.is_empty());
        if message
            .as_ref()
            .is_some_and(|m| m.chars().count() > MAX_MESSAGE_LENGTH)
        {
            return Err(BookingError::MessageTooLong);
        }

        let car_id = car.parse::<CarId>().map_err(|_| BookingError::CarNotFound)?;
        if self.store.car_by_id(car_id).await?.is_none() {
            return Err(BookingError::CarNotFound);
        }

        let booking = self
            .store
            .insert_test_drive(NewTestDrive {
                requester: requester.id,
                car: car_id,
                date,
                time_slot,
                contact_number: contact_number.to_owned(),
                message,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => BookingError::SlotTaken,
                RepositoryError::NotFound => BookingError::CarNotFound,
                other => BookingError::Repository(other),
            })?;

        tracing::info!(
            test_drive_id = %booking.id,
            car_id = %booking.car,
            date = %booking.date,
            time_slot = %booking.time_slot,
            "Test drive booked"
        );
        Ok(booking)
    }

    /// The requester's bookings in creation order, with car details.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::Repository` if the store fails.
    pub async fn bookings_for(
        &self,
        requester: &Identity,
    ) -> Result<Vec<TestDriveListing>, BookingError> {
        Ok(self.store.test_drives_for_user(requester.id).await?)
    }

    /// Move a booking to a new status.
    ///
    /// Checks run in order: target status, existence, permission, edge of
    /// the status machine. The write is compare-and-set against the status
    /// that was read; losing a race reports `InvalidTransition` from the
    /// status that won.
    ///
    /// # Errors
    ///
    /// - `InvalidStatus` if the target is missing, unknown or `booked`
    /// - `NotFound` if the booking does not exist
    /// - `NotPermitted` if the actor is neither the requester nor an admin
    /// - `InvalidTransition` if the transition is not allowed
    #[instrument(skip_all, fields(user_id = %actor.id, test_drive_id = %booking_id))]
    pub async fn update_status(
        &self,
        actor: &Identity,
        booking_id: &str,
        status: Option<&str>,
    ) -> Result<TestDrive, BookingError> {
        let target = TestDriveStatus::parse_update_target(status.unwrap_or_default())?;
        let id = booking_id
            .parse::<TestDriveId>()
            .map_err(|_| BookingError::NotFound)?;

        let current = self
            .store
            .test_drive_by_id(id)
            .await?
            .ok_or(BookingError::NotFound)?;
        if !actor.may_act_for(current.requester) {
            tracing::warn!(owner_id = %current.requester, "Status update refused");
            return Err(BookingError::NotPermitted);
        }

        let next = current.status.transition_to(target)?;
        match self
            .store
            .update_test_drive_status(id, current.status, next)
            .await?
        {
            Some(updated) => {
                tracing::info!(from = %current.status, to = %next, "Test drive status changed");
                Ok(updated)
            }
            None => {
                let winner = self
                    .store
                    .test_drive_by_id(id)
                    .await?
                    .ok_or(BookingError::NotFound)?;
                Err(BookingError::InvalidTransition(TransitionError {
                    from: winner.status,
                    to: target,
                }))
            }
        }
    }

    /// Every booking, newest first, with car and requester details.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::Repository` if the store fails.
    pub async fn all_bookings(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<TestDriveListing>, BookingError> {
        Ok(self.store.list_test_drives(limit).await?)
    }
}

/// Trimmed, non-empty value or `MissingField`.
fn required<'v>(value: Option<&'v str>, field: &'static str) -> Result<&'v str, BookingError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(BookingError::MissingField(field))
}
