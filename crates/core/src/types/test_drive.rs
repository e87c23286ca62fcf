//! Test-drive booking types and the booking state machine.
//!
//! # State machine
//!
//! ```text
//!            ┌──────────► canceled
//!            │                ▲
//!   booked ──┴─► confirmed ───┤
//!                    │
//!                    └──────► completed
//! ```
//!
//! `completed` and `canceled` are terminal. A booking holds its slot
//! (car, date, time slot) in every state except `canceled`.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// Maximum length of the optional buyer message, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 500;

/// Status of a test-drive booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestDriveStatus {
    /// Requested by the buyer; holds the slot.
    #[default]
    Booked,
    /// Accepted by the seller or an admin.
    Confirmed,
    /// The drive took place.
    Completed,
    /// Withdrawn; the slot is free again.
    Canceled,
}

/// Error returned when a status string cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    /// Not a status at all.
    #[error("unknown status: {0}")]
    Unknown(String),
    /// A real status that can never be the target of an update.
    #[error("status cannot be set to {0}")]
    NotAssignable(TestDriveStatus),
}

/// Error returned when a transition is not an edge of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot change status from {from} to {to}")]
pub struct TransitionError {
    /// Current status.
    pub from: TestDriveStatus,
    /// Requested status.
    pub to: TestDriveStatus,
}

impl TestDriveStatus {
    /// Statuses an update request may ask for.
    pub const ASSIGNABLE: [Self; 3] = [Self::Confirmed, Self::Completed, Self::Canceled];

    /// The persisted/serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Booked => "booked",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }

    /// No transition leaves a terminal status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// Whether a booking in this status blocks its (car, date, slot).
    #[must_use]
    pub const fn holds_slot(self) -> bool {
        !matches!(self, Self::Canceled)
    }

    /// Whether `self -> next` is an edge of the state machine.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Booked, Self::Confirmed | Self::Canceled)
                | (Self::Confirmed, Self::Completed | Self::Canceled)
        )
    }

    /// Apply a transition.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` if `next` is not reachable from `self`.
    pub const fn transition_to(self, next: Self) -> Result<Self, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }

    /// Parse the target of a status update request.
    ///
    /// Only `confirmed`, `completed` and `canceled` are accepted; `booked`
    /// is the initial status and can never be requested.
    ///
    /// # Errors
    ///
    /// Returns `StatusError::Unknown` for unrecognized strings and
    /// `StatusError::NotAssignable` for `booked`.
    pub fn parse_update_target(s: &str) -> Result<Self, StatusError> {
        let status: Self = s.parse()?;
        if Self::ASSIGNABLE.contains(&status) {
            Ok(status)
        } else {
            Err(StatusError::NotAssignable(status))
        }
    }
}

impl std::fmt::Display for TestDriveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TestDriveStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booked" => Ok(Self::Booked),
            "confirmed" => Ok(Self::Confirmed),
            "completed" => Ok(Self::Completed),
            "canceled" => Ok(Self::Canceled),
            _ => Err(StatusError::Unknown(s.to_owned())),
        }
    }
}

/// Error returned for an empty time slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("time slot cannot be empty")]
pub struct TimeSlotError;

/// Opaque time-slot label such as `"10:00 AM"`.
///
/// Slots are compared byte-for-byte: `"10:00 AM"` and `"10:00am"` are
/// different slots. Only blank labels are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSlot(String);

impl TimeSlot {
    /// Validate a time-slot label.
    ///
    /// # Errors
    ///
    /// Returns `TimeSlotError` if the label is empty or only whitespace.
    pub fn parse(s: &str) -> Result<Self, TimeSlotError> {
        if s.trim().is_empty() {
            return Err(TimeSlotError);
        }
        Ok(Self(s.to_owned()))
    }

    /// The label as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when a booking date cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date: {0} (expected YYYY-MM-DD)")]
pub struct BookingDateError(pub String);

/// Parse the calendar day of a booking.
///
/// Accepts a plain `YYYY-MM-DD` day or an RFC 3339 timestamp, which is
/// reduced to its UTC calendar day.
///
/// # Errors
///
/// Returns `BookingDateError` if neither format matches.
pub fn parse_booking_date(s: &str) -> Result<NaiveDate, BookingDateError> {
    let trimmed = s.trim();
    if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(day);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|ts| ts.naive_utc().date())
        .map_err(|_| BookingDateError(s.to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use TestDriveStatus::{Booked, Canceled, Completed, Confirmed};

    const ALL: [TestDriveStatus; 4] = [Booked, Confirmed, Completed, Canceled];

    #[test]
    fn test_transition_table() {
        let allowed = [
            (Booked, Confirmed),
            (Booked, Canceled),
            (Confirmed, Completed),
            (Confirmed, Canceled),
        ];

        for from in ALL {
            for to in ALL {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{from} -> {to} should be {}",
                    if expected { "allowed" } else { "rejected" }
                );
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(from.transition_to(to).is_err());
            }
        }
    }

    #[test]
    fn test_transition_error_reports_edge() {
        let err = Completed.transition_to(Booked).unwrap_err();
        assert_eq!(err.from, Completed);
        assert_eq!(err.to, Booked);
        assert_eq!(err.to_string(), "cannot change status from completed to booked");
    }

    #[test]
    fn test_only_canceled_releases_slot() {
        assert!(Booked.holds_slot());
        assert!(Confirmed.holds_slot());
        assert!(Completed.holds_slot());
        assert!(!Canceled.holds_slot());
    }

    #[test]
    fn test_parse_update_target() {
        assert_eq!(TestDriveStatus::parse_update_target("confirmed"), Ok(Confirmed));
        assert_eq!(TestDriveStatus::parse_update_target("canceled"), Ok(Canceled));
        assert_eq!(
            TestDriveStatus::parse_update_target("booked"),
            Err(StatusError::NotAssignable(Booked))
        );
        assert!(matches!(
            TestDriveStatus::parse_update_target("cancelled"),
            Err(StatusError::Unknown(_))
        ));
        assert!(TestDriveStatus::parse_update_target("Confirmed").is_err());
    }

    #[test]
    fn test_time_slot_is_not_normalized() {
        let a = TimeSlot::parse("10:00 AM").unwrap();
        let b = TimeSlot::parse("10:00am").unwrap();
        assert_ne!(a, b);
        assert!(TimeSlot::parse("   ").is_err());
    }

    #[test]
    fn test_parse_booking_date_formats() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(parse_booking_date("2024-06-01").unwrap(), day);
        assert_eq!(parse_booking_date("2024-06-01T00:00:00.000Z").unwrap(), day);
        assert_eq!(parse_booking_date("2024-06-01T23:30:00-02:00").unwrap(), day.succ_opt().unwrap());
        assert!(parse_booking_date("06/01/2024").is_err());
        assert!(parse_booking_date("2024-02-30").is_err());
    }
}
