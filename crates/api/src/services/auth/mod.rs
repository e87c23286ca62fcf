//! Authentication and account service.
//!
//! Provides password registration/login, token resolution for the auth
//! extractors, and self-service profile management.

mod error;
mod token;

pub use error::AuthError;
pub use token::{TOKEN_TTL, TokenSigner};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use carmart_core::{Email, Role, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::{Identity, NewUser, User, UserChanges};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Fields submitted when registering.
#[derive(Debug, Default)]
pub struct Registration {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

/// Fields submitted when editing a profile. `None` leaves a field as is.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

/// Authentication service.
///
/// Handles registration, login, identity resolution and profile changes.
pub struct AuthService<'a> {
    store: &'a dyn Store,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Register a new account with the `user` role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` if name, email or password is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip_all)]
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        self.create_account(registration, Role::User).await
    }

    /// Create an account with an explicit role (operator tooling only).
    ///
    /// # Errors
    ///
    /// Same as [`AuthService::register`].
    #[instrument(skip_all, fields(role = %role))]
    pub async fn create_account(
        &self,
        registration: Registration,
        role: Role,
    ) -> Result<User, AuthError> {
        let name = required(registration.name, "name")?;
        let email = Email::parse(&required(registration.email, "email")?)?;
        let password = registration.password.ok_or(AuthError::MissingField("password"))?;
        validate_password(&password)?;
        let password_hash = hash_password(&password)?;

        let user = self
            .store
            .create_user(NewUser {
                name,
                email,
                password_hash,
                role,
                phone_number: optional(registration.phone_number),
                address: optional(registration.address),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Account created");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// Unknown emails and wrong passwords produce the same error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` if either value is blank and
    /// `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip_all)]
    pub async fn login(
        &self,
        email: Option<String>,
        password: Option<String>,
    ) -> Result<User, AuthError> {
        let email = required(email, "email")?;
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or(AuthError::MissingField("password"))?;
        let email = Email::parse(&email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .store
            .user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(&password, &user.password_hash)?;

        Ok(user)
    }

    /// Resolve the account a verified token was issued for.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account has been deleted.
    pub async fn identity(&self, user_id: UserId) -> Result<Identity, AuthError> {
        let user = self.get_user(user_id).await?;
        Ok(Identity::from(&user))
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.store
            .user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::WeakPassword` or
    /// `AuthError::MissingField` for invalid values and
    /// `AuthError::UserAlreadyExists` if the new email is taken.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, AuthError> {
        let name = match update.name {
            Some(name) => Some(required(Some(name), "name")?),
            None => None,
        };
        let email = update.email.as_deref().map(Email::parse).transpose()?;
        let password_hash = match update.password {
            Some(password) => {
                validate_password(&password)?;
                Some(hash_password(&password)?)
            }
            None => None,
        };

        let changes = UserChanges {
            name,
            email,
            password_hash,
            phone_number: update.phone_number.map(|p| p.trim().to_owned()),
            address: update.address.map(|a| a.trim().to_owned()),
        };
        if changes.is_empty() {
            return self.get_user(user_id).await;
        }

        self.store
            .update_user(user_id, changes)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    /// Delete an account along with its listings and bookings.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account was already gone.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn delete_account(&self, user_id: UserId) -> Result<(), AuthError> {
        if self.store.delete_user(user_id).await? {
            tracing::info!("Account deleted");
            Ok(())
        } else {
            Err(AuthError::UserNotFound)
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Trimmed, non-empty value or `MissingField`.
fn required(value: Option<String>, field: &'static str) -> Result<String, AuthError> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingField(field))
}

/// Trimmed value, with blanks treated as absent.
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::PasswordHash)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn registration(email: &str) -> Registration {
        Registration {
            name: Some("  Priya  ".to_string()),
            email: Some(email.to_string()),
            password: Some("correct horse".to_string()),
            phone_number: Some("   ".to_string()),
            address: None,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(verify_password("hunter2hunter2", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong-password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("12345678").is_ok());
    }

    #[tokio::test]
    async fn test_register_normalizes_and_defaults_role() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let user = auth.register(registration("Priya@Cars.Example")).await.unwrap();
        assert_eq!(user.name, "Priya");
        assert_eq!(user.email.as_str(), "priya@cars.example");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.phone_number, None);
        assert_ne!(user.password_hash, "correct horse");
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        auth.register(registration("dup@cars.example")).await.unwrap();
        let err = auth
            .register(registration("DUP@cars.example"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_register_missing_fields() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let err = auth
            .register(Registration {
                name: Some(" ".to_string()),
                ..registration("x@cars.example")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingField("name")));
    }

    #[tokio::test]
    async fn test_login_does_not_reveal_which_part_failed() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register(registration("login@cars.example")).await.unwrap();

        let ok = auth
            .login(
                Some("LOGIN@cars.example".to_string()),
                Some("correct horse".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(ok.email.as_str(), "login@cars.example");

        let wrong_password = auth
            .login(
                Some("login@cars.example".to_string()),
                Some("battery staple".to_string()),
            )
            .await
            .unwrap_err();
        let unknown_email = auth
            .login(
                Some("nobody@cars.example".to_string()),
                Some("correct horse".to_string()),
            )
            .await
            .unwrap_err();
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_update_profile_changes_password_and_rejects_taken_email() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        let user = auth.register(registration("me@cars.example")).await.unwrap();
        auth.register(registration("taken@cars.example")).await.unwrap();

        let updated = auth
            .update_profile(
                user.id,
                ProfileUpdate {
                    address: Some("12 Elm St".to_string()),
                    password: Some("new password!".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.address.as_deref(), Some("12 Elm St"));
        assert!(
            auth.login(
                Some("me@cars.example".to_string()),
                Some("new password!".to_string())
            )
            .await
            .is_ok()
        );

        let err = auth
            .update_profile(
                user.id,
                ProfileUpdate {
                    email: Some("taken@cars.example".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_deleted_account_no_longer_resolves() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        let user = auth.register(registration("gone@cars.example")).await.unwrap();

        auth.delete_account(user.id).await.unwrap();
        assert!(matches!(
            auth.identity(user.id).await,
            Err(AuthError::UserNotFound)
        ));
    }
}
