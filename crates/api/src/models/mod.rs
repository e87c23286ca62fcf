//! Domain models for the marketplace API.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`]. Types that leave the API serialize with camelCase keys.

pub mod car;
pub mod identity;
pub mod test_drive;
pub mod user;

pub use car::{
    Car, CarImage, CarSummary, CarView, CarWithOwner, NewCar, SellerName, SimilarCarQuery,
};
pub use identity::Identity;
pub use test_drive::{NewTestDrive, TestDrive, TestDriveListing, TestDriveView};
pub use user::{NewUser, User, UserChanges, UserProfile, UserSummary};
