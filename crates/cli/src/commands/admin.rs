//! Admin account commands.
//!
//! The API never accepts a role from clients, so admins are made here.
//!
//! # Usage
//!
//! ```bash
//! carmart admin promote -e owner@example.com
//! carmart admin create -e admin@example.com -n "Admin Name" -p 'long password'
//! ```

use carmart_api::db::{PgStore, RepositoryError, UserStore};
use carmart_api::services::auth::{AuthError, AuthService, Registration};
use carmart_core::{Email, Role, UserId};
use thiserror::Error;

use super::CommandError;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No account has the email.
    #[error("No account with email: {0}")]
    UnknownUser(String),

    /// Account creation failed.
    #[error("Could not create account: {0}")]
    Auth(#[from] AuthError),

    /// Store error.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Grant the admin role to an existing account.
///
/// # Errors
///
/// Returns an error if the email is invalid or unknown.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    let store = PgStore::new(super::connect().await?);

    let user = store
        .set_user_role(&email, Role::Admin)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::UnknownUser(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!("Promoted {} (ID: {}) to admin", user.email, user.id);
    Ok(())
}

/// Create a new account with the admin role.
///
/// # Returns
///
/// The ID of the created account.
///
/// # Errors
///
/// Returns an error if validation fails or the email is already registered.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<UserId, AdminError> {
    let store = PgStore::new(super::connect().await?);

    tracing::info!("Creating admin account: {}", email);
    let user = AuthService::new(&store)
        .create_account(
            Registration {
                name: Some(name.to_owned()),
                email: Some(email.to_owned()),
                password: Some(password.to_owned()),
                phone_number: None,
                address: None,
            },
            Role::Admin,
        )
        .await?;

    tracing::info!(
        "Admin account created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(user.id)
}
