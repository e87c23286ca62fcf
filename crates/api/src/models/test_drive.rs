//! Test-drive booking domain types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use carmart_core::{CarId, TestDriveId, TestDriveStatus, TimeSlot, UserId};

use super::car::CarSummary;
use super::user::UserSummary;

/// A booking of one car for one time slot on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDrive {
    #[serde(rename = "_id")]
    pub id: TestDriveId,
    /// The buyer who requested the drive.
    #[serde(rename = "user")]
    pub requester: UserId,
    pub car: CarId,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub contact_number: String,
    pub message: Option<String>,
    pub status: TestDriveStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestDrive {
    /// Whether this booking occupies `(car, date, time_slot)`.
    #[must_use]
    pub fn occupies(&self, car: CarId, date: NaiveDate, time_slot: &TimeSlot) -> bool {
        self.status.holds_slot()
            && self.car == car
            && self.date == date
            && &self.time_slot == time_slot
    }
}

/// Fields for inserting a booking. New bookings always start as `booked`.
#[derive(Debug, Clone)]
pub struct NewTestDrive {
    pub requester: UserId,
    pub car: CarId,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub contact_number: String,
    pub message: Option<String>,
}

/// A booking joined with its car and requester.
#[derive(Debug, Clone)]
pub struct TestDriveListing {
    pub test_drive: TestDrive,
    pub car: CarSummary,
    pub requester: UserSummary,
}

/// Booking as returned by list endpoints, with related records embedded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDriveView<U> {
    #[serde(rename = "_id")]
    pub id: TestDriveId,
    pub user: U,
    pub car: CarSummary,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub contact_number: String,
    pub message: Option<String>,
    pub status: TestDriveStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestDriveListing {
    fn view<U>(self, user: U) -> TestDriveView<U> {
        let td = self.test_drive;
        TestDriveView {
            id: td.id,
            user,
            car: self.car,
            date: td.date,
            time_slot: td.time_slot,
            contact_number: td.contact_number,
            message: td.message,
            status: td.status,
            created_at: td.created_at,
            updated_at: td.updated_at,
        }
    }

    /// View for the requester's own list: the user stays a bare ID.
    #[must_use]
    pub fn into_owner_view(self) -> TestDriveView<UserId> {
        let requester = self.test_drive.requester;
        self.view(requester)
    }

    /// View for admins: the requester's name and email are embedded.
    #[must_use]
    pub fn into_admin_view(self) -> TestDriveView<UserSummary> {
        let requester = self.requester.clone();
        self.view(requester)
    }
}
