//! Booking queries.
//!
//! Slot uniqueness is enforced by the partial unique index
//! `test_drives_active_slot_idx`, so two concurrent inserts for the same
//! live slot resolve to one row and one `Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use carmart_core::{CarId, Email, TestDriveId, TestDriveStatus, TimeSlot, UserId};

use super::PgStore;
use crate::db::{RepositoryError, TestDriveStore};
use crate::models::{CarSummary, NewTestDrive, TestDrive, TestDriveListing, UserSummary};

macro_rules! test_drive_columns {
    () => {
        "t.id, t.user_id, t.car_id, t.date, t.time_slot, t.contact_number, t.message, \
         t.status, t.created_at, t.updated_at"
    };
}

macro_rules! listing_select {
    () => {
        concat!(
            "SELECT ",
            test_drive_columns!(),
            ", c.make AS car_make, c.model AS car_model, c.year AS car_year, \
             u.name AS user_name, u.email AS user_email \
             FROM carmart.test_drives t \
             JOIN carmart.cars c ON c.id = t.car_id \
             JOIN carmart.users u ON u.id = t.user_id"
        )
    };
}

#[derive(sqlx::FromRow)]
struct TestDriveRow {
    id: i32,
    user_id: i32,
    car_id: i32,
    date: NaiveDate,
    time_slot: String,
    contact_number: String,
    message: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TestDriveRow> for TestDrive {
    type Error = RepositoryError;

    fn try_from(row: TestDriveRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<TestDriveStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid status in database: {e}"))
        })?;
        let time_slot = TimeSlot::parse(&row.time_slot).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid time slot in database: {e}"))
        })?;

        Ok(Self {
            id: TestDriveId::new(row.id),
            requester: UserId::new(row.user_id),
            car: CarId::new(row.car_id),
            date: row.date,
            time_slot,
            contact_number: row.contact_number,
            message: row.message,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TestDriveListingRow {
    #[sqlx(flatten)]
    test_drive: TestDriveRow,
    car_make: String,
    car_model: String,
    car_year: i32,
    user_name: String,
    user_email: String,
}

impl TryFrom<TestDriveListingRow> for TestDriveListing {
    type Error = RepositoryError;

    fn try_from(row: TestDriveListingRow) -> Result<Self, Self::Error> {
        let test_drive = TestDrive::try_from(row.test_drive)?;
        let email = Email::parse(&row.user_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            car: CarSummary {
                id: test_drive.car,
                make: row.car_make,
                model: row.car_model,
                year: row.car_year,
            },
            requester: UserSummary {
                id: test_drive.requester,
                name: row.user_name,
                email,
            },
            test_drive,
        })
    }
}

#[async_trait]
impl TestDriveStore for PgStore {
    async fn insert_test_drive(&self, booking: NewTestDrive) -> Result<TestDrive, RepositoryError> {
        let row = sqlx::query_as::<_, TestDriveRow>(concat!(
            "INSERT INTO carmart.test_drives AS t \
                 (user_id, car_id, date, time_slot, contact_number, message) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING ",
            test_drive_columns!()
        ))
        .bind(booking.requester)
        .bind(booking.car)
        .bind(booking.date)
        .bind(booking.time_slot.as_str())
        .bind(&booking.contact_number)
        .bind(booking.message.as_deref())
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return RepositoryError::Conflict("time slot already booked".to_owned());
                }
                // The car (or requester) was deleted between lookup and insert.
                if db_err.is_foreign_key_violation() {
                    return RepositoryError::NotFound;
                }
            }
            RepositoryError::Database(e)
        })?;

        row.try_into()
    }

    async fn test_drive_by_id(&self, id: TestDriveId) -> Result<Option<TestDrive>, RepositoryError> {
        sqlx::query_as::<_, TestDriveRow>(concat!(
            "SELECT ",
            test_drive_columns!(),
            " FROM carmart.test_drives t WHERE t.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .map(TestDrive::try_from)
        .transpose()
    }

    async fn update_test_drive_status(
        &self,
        id: TestDriveId,
        expected: TestDriveStatus,
        next: TestDriveStatus,
    ) -> Result<Option<TestDrive>, RepositoryError> {
        sqlx::query_as::<_, TestDriveRow>(concat!(
            "UPDATE carmart.test_drives AS t SET status = $3, updated_at = NOW() \
             WHERE t.id = $1 AND t.status = $2 RETURNING ",
            test_drive_columns!()
        ))
        .bind(id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .fetch_optional(self.pool())
        .await?
        .map(TestDrive::try_from)
        .transpose()
    }

    async fn test_drives_for_user(
        &self,
        requester: UserId,
    ) -> Result<Vec<TestDriveListing>, RepositoryError> {
        sqlx::query_as::<_, TestDriveListingRow>(concat!(
            listing_select!(),
            " WHERE t.user_id = $1 ORDER BY t.created_at, t.id"
        ))
        .bind(requester)
        .fetch_all(self.pool())
        .await?
        .into_iter()
        .map(TestDriveListing::try_from)
        .collect()
    }

    async fn list_test_drives(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<TestDriveListing>, RepositoryError> {
        sqlx::query_as::<_, TestDriveListingRow>(concat!(
            listing_select!(),
            " ORDER BY t.created_at DESC, t.id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool())
        .await?
        .into_iter()
        .map(TestDriveListing::try_from)
        .collect()
    }

    async fn count_test_drives(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM carmart.test_drives")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}
