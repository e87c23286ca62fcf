//! Core types for Carmart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod car;
pub mod email;
pub mod id;
pub mod price;
pub mod role;
pub mod test_drive;

pub use car::{CarCondition, ConditionError};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use role::{Role, RoleError};
pub use test_drive::{
    BookingDateError, MAX_MESSAGE_LENGTH, StatusError, TestDriveStatus, TimeSlot, TimeSlotError,
    TransitionError, parse_booking_date,
};
