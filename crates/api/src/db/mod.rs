//! Persistence for accounts, listings and bookings.
//!
//! # Database: `carmart`
//!
//! ## Tables
//!
//! - `carmart.users` - Accounts (unique email, role `user`/`admin`)
//! - `carmart.cars` - Listings, photos stored as JSONB
//! - `carmart.test_drives` - Bookings; a partial unique index on
//!   `(car_id, date, time_slot) WHERE status <> 'canceled'` keeps at most
//!   one live booking per slot
//!
//! # Stores
//!
//! Handlers talk to the [`Store`] trait object held in application state.
//! [`PgStore`] is the production implementation; [`MemoryStore`] backs tests
//! and local experiments and enforces the same uniqueness rules under a lock.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p carmart-cli -- migrate
//! ```

mod memory;
mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use carmart_core::{CarId, Email, Role, TestDriveId, TestDriveStatus, UserId};

use crate::models::{
    Car, CarWithOwner, NewCar, NewTestDrive, NewUser, SimilarCarQuery, TestDrive,
    TestDriveListing, User, UserChanges,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (unique email, occupied slot).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Embedded schema migrations for the `carmart` schema.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Account persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Look up an account by ID.
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Look up an account by normalized email.
    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist and
    /// `RepositoryError::Conflict` if the new email is taken.
    async fn update_user(&self, id: UserId, changes: UserChanges) -> Result<User, RepositoryError>;

    /// Change an account's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no account has this email.
    async fn set_user_role(&self, email: &Email, role: Role) -> Result<User, RepositoryError>;

    /// Delete an account together with its listings and bookings.
    ///
    /// Returns `false` if the account did not exist.
    async fn delete_user(&self, id: UserId) -> Result<bool, RepositoryError>;

    /// All accounts, newest first.
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    async fn count_users(&self) -> Result<i64, RepositoryError>;
}

/// Listing persistence.
#[async_trait]
pub trait CarStore: Send + Sync {
    /// Insert a listing.
    async fn create_car(&self, car: NewCar) -> Result<Car, RepositoryError>;

    async fn car_by_id(&self, id: CarId) -> Result<Option<Car>, RepositoryError>;

    /// A listing with its seller's name and email.
    async fn car_with_owner(&self, id: CarId) -> Result<Option<CarWithOwner>, RepositoryError>;

    /// Every listing with its seller, newest first.
    async fn list_cars(&self) -> Result<Vec<CarWithOwner>, RepositoryError>;

    /// A seller's own listings, newest first.
    async fn cars_by_owner(&self, owner: UserId) -> Result<Vec<Car>, RepositoryError>;

    /// Listings matching every present criterion, newest first.
    async fn find_similar_cars(
        &self,
        query: &SimilarCarQuery,
    ) -> Result<Vec<Car>, RepositoryError>;

    async fn count_cars(&self) -> Result<i64, RepositoryError>;
}

/// Booking persistence.
///
/// Implementations guarantee that at most one booking holding a slot exists
/// per `(car, date, time_slot)`, even under concurrent inserts.
#[async_trait]
pub trait TestDriveStore: Send + Sync {
    /// Insert a `booked` booking if its slot is free.
    ///
    /// The check and the insert are a single atomic step.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a live booking already holds
    /// the slot.
    async fn insert_test_drive(&self, booking: NewTestDrive) -> Result<TestDrive, RepositoryError>;

    async fn test_drive_by_id(&self, id: TestDriveId) -> Result<Option<TestDrive>, RepositoryError>;

    /// Compare-and-set the status of a booking.
    ///
    /// Writes `next` only if the stored status is still `expected`. Returns
    /// `None` when the booking is gone or its status moved concurrently.
    async fn update_test_drive_status(
        &self,
        id: TestDriveId,
        expected: TestDriveStatus,
        next: TestDriveStatus,
    ) -> Result<Option<TestDrive>, RepositoryError>;

    /// A requester's bookings in creation order.
    async fn test_drives_for_user(
        &self,
        requester: UserId,
    ) -> Result<Vec<TestDriveListing>, RepositoryError>;

    /// All bookings, newest first, optionally limited.
    async fn list_test_drives(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<TestDriveListing>, RepositoryError>;

    async fn count_test_drives(&self) -> Result<i64, RepositoryError>;
}

/// Everything the API needs from persistence.
#[async_trait]
pub trait Store: UserStore + CarStore + TestDriveStore {
    /// Verify the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Map a unique violation to `RepositoryError::Conflict`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(err)
}
