//! The authenticated caller of a request.

use serde::Serialize;

use carmart_core::{Email, Role, UserId};

use super::user::User;

/// Who is making the request.
///
/// Resolved from the credential on every request by the auth extractors, so
/// role changes and account deletion take effect immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Account ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: Email,
    /// Account role.
    pub role: Role,
}

impl Identity {
    /// Whether the caller holds the admin role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether the caller owns the resource, or is an admin.
    #[must_use]
    pub fn may_act_for(&self, owner: UserId) -> bool {
        self.id == owner || self.is_admin()
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}
