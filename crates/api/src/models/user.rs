//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use carmart_core::{Email, Role, UserId};

/// A marketplace account.
///
/// `Debug` is implemented manually so the password hash never reaches logs.
#[derive(Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email (unique, normalized).
    pub email: Email,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Account role.
    pub role: Role,
    /// Optional phone number.
    pub phone_number: Option<String>,
    /// Optional postal address.
    pub address: Option<String>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("role", &self.role)
            .field("phone_number", &self.phone_number)
            .field("address", &self.address)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Fields for inserting a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

/// Partial profile update. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub password_hash: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

impl UserChanges {
    /// True when nothing would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.phone_number.is_none()
            && self.address.is_none()
    }
}

/// Account as shown to its owner and to admins. Never carries the hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            phone_number: user.phone_number.clone(),
            address: user.address.clone(),
            created_at: user.created_at,
        }
    }
}

/// Name and email of a related account, embedded in listings and bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: Email,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: UserId::new(3),
            name: "Dana".to_string(),
            email: Email::parse("dana@cars.example").unwrap(),
            password_hash: "$argon2id$v=19$secret-material".to_string(),
            role: Role::User,
            phone_number: Some("555-0100".to_string()),
            address: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_debug_redacts_password_hash() {
        let debug = format!("{:?}", user());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret-material"));
    }

    #[test]
    fn test_profile_json_shape() {
        let json = serde_json::to_value(UserProfile::from(&user())).unwrap();
        assert_eq!(json["_id"], 3);
        assert_eq!(json["email"], "dana@cars.example");
        assert_eq!(json["role"], "user");
        assert_eq!(json["phoneNumber"], "555-0100");
        assert!(json.get("passwordHash").is_none());
    }

    #[test]
    fn test_empty_changes() {
        assert!(UserChanges::default().is_empty());
        let changes = UserChanges {
            address: Some("1 Main St".to_string()),
            ..UserChanges::default()
        };
        assert!(!changes.is_empty());
    }
}
