//! Marketplace overview for administrators.

use serde::Serialize;

use crate::db::{RepositoryError, Store};
use crate::models::{CarWithOwner, TestDriveListing, User};

/// Bookings shown on the analytics overview.
pub const RECENT_TEST_DRIVES: i64 = 5;

/// Headline numbers plus the latest bookings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics<T> {
    pub total_users: i64,
    pub total_car_listings: i64,
    pub total_test_drives: i64,
    pub recent_test_drives: Vec<T>,
}

/// Read-only admin queries.
pub struct AdminService<'a> {
    store: &'a dyn Store,
}

impl<'a> AdminService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Counts of users, listings and bookings with the newest bookings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn analytics(&self) -> Result<Analytics<TestDriveListing>, RepositoryError> {
        let (total_users, total_car_listings, total_test_drives, recent_test_drives) = tokio::try_join!(
            self.store.count_users(),
            self.store.count_cars(),
            self.store.count_test_drives(),
            self.store.list_test_drives(Some(RECENT_TEST_DRIVES)),
        )?;
        Ok(Analytics {
            total_users,
            total_car_listings,
            total_test_drives,
            recent_test_drives,
        })
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn cars(&self) -> Result<Vec<CarWithOwner>, RepositoryError> {
        self.store.list_cars().await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn users(&self) -> Result<Vec<User>, RepositoryError> {
        self.store.list_users().await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn test_drives(&self) -> Result<Vec<TestDriveListing>, RepositoryError> {
        self.store.list_test_drives(None).await
    }
}

impl<T> Analytics<T> {
    /// Convert the recent bookings into another representation.
    pub fn map_recent<U>(self, f: impl FnMut(T) -> U) -> Analytics<U> {
        Analytics {
            total_users: self.total_users,
            total_car_listings: self.total_car_listings,
            total_test_drives: self.total_test_drives,
            recent_test_drives: self.recent_test_drives.into_iter().map(f).collect(),
        }
    }
}
