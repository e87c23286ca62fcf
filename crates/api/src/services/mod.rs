//! Business logic, independent of HTTP.
//!
//! Services borrow the store (and whatever else they need) from application
//! state for the duration of one request.

pub mod admin;
pub mod auth;
pub mod booking;
pub mod images;
pub mod listings;
